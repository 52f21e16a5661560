use serde::{Deserialize, Serialize};

use super::types::{Address, RequestId, Score};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    CheckReputation {
        id: RequestId,
        target: Address,
    },
    ReputationReceived {
        id: RequestId,
        score: Score,
        target: Address,
    },
    ClosedLoan,
}

impl ProtocolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolEvent::CheckReputation { .. } => "CheckReputation",
            ProtocolEvent::ReputationReceived { .. } => "ReputationReceived",
            ProtocolEvent::ClosedLoan => "ClosedLoan",
        }
    }

    /// Event fields as ordered key/value pairs, the form observers read them in.
    pub fn attributes(&self) -> Vec<(String, String)> {
        match self {
            ProtocolEvent::CheckReputation { id, target } => vec![
                (String::from("id"), id.to_string()),
                (String::from("target"), target.to_string()),
            ],
            ProtocolEvent::ReputationReceived { id, score, target } => vec![
                (String::from("id"), id.to_string()),
                (String::from("score"), score.to_string()),
                (String::from("target"), target.to_string()),
            ],
            ProtocolEvent::ClosedLoan => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub emitter: Address,
    pub event: ProtocolEvent,
}

/// Append-only event log. Sequence numbers start at 1 and never repeat.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn emit(&mut self, emitter: &Address, event: ProtocolEvent) -> u64 {
        let sequence = self.last_sequence() + 1;
        self.records.push(EventRecord {
            sequence,
            emitter: emitter.clone(),
            event,
        });
        sequence
    }

    pub fn last_sequence(&self) -> u64 {
        self.records.last().map(|r| r.sequence).unwrap_or(0)
    }

    /// Records with a sequence strictly greater than `cursor`, at most `limit`.
    pub fn since(&self, cursor: u64, limit: usize) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.sequence <= cursor);
        let end = start.saturating_add(limit).min(self.records.len());
        &self.records[start..end]
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
