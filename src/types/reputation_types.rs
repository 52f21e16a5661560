use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct CheckReputation_Type {
    pub id: String,
    pub target: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReputationReceived_Type {
    pub id: String,
    pub score: String,
    pub target: String,
}
