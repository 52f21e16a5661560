use serde::Deserialize;

use crate::error::Error;

pub const REACHABLE: &str = "reachable";

#[derive(Debug, Deserialize)]
pub struct MinersResponse {
    #[serde(default)]
    pub miners: Vec<Miner>,
}

#[derive(Debug, Deserialize)]
pub struct Miner {
    pub address: String,
    pub score: ScoreValue,
    pub reachability: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Text(String),
}

impl ScoreValue {
    /// Whole-point score, fractions floored, negatives clamped to zero.
    pub fn value(&self) -> Result<u32, Error> {
        let raw = match self {
            ScoreValue::Number(n) => *n,
            ScoreValue::Text(s) => s.trim().parse::<f64>().map_err(|e| {
                Error::ParseMessage(format!("score {}: {}", s, e))
            })?,
        };

        if !raw.is_finite() {
            return Err(Error::ParseMessage(format!("score {}", raw)));
        }

        Ok(raw.max(0.0).min(f64::from(u32::MAX)).floor() as u32)
    }
}

impl Miner {
    pub fn is_reachable(&self) -> bool {
        self.reachability.as_deref() == Some(REACHABLE)
    }
}
