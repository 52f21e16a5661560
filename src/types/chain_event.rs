use serde::{Deserialize, Serialize};

use crate::protocol::EventRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub key: String,
    pub value: Option<String>,
}

/// Event as delivered by the ledger, in sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub sequence: u64,
    pub emitter: String,
    pub r#type: String,
    pub attributes: Vec<Attributes>,
}

impl From<&EventRecord> for ChainEvent {
    fn from(record: &EventRecord) -> Self {
        ChainEvent {
            sequence: record.sequence,
            emitter: record.emitter.to_string(),
            r#type: record.event.name().to_owned(),
            attributes: record
                .event
                .attributes()
                .into_iter()
                .map(|(key, value)| Attributes {
                    key,
                    value: Some(value),
                })
                .collect(),
        }
    }
}
