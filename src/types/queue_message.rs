use serde::{Deserialize, Serialize};

/// Result record handed to the downstream consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: u64,
    pub address: String,
    pub response: u32,
}
