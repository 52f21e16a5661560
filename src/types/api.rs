use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CheckReputationRequest {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckReputationResponse {
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelayStatus {
    pub cursor: u64,
    pub outbox: Vec<StatusCount>,
}
