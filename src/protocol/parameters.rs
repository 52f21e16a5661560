use super::types::{Duration, InterestRate, Score, DAY};

/// Interest rates are whole percent: a rate of 10 adds 10% to the principal.
pub const RATE_BASE: u128 = 100;
pub const MAX_INTEREST_RATE: InterestRate = 100;
pub const WITHDRAW_INTERVAL: Duration = 30 * DAY;
pub const REQUEST_TTL: Duration = DAY;
pub const MIN_REPUTATION_SCORE: Score = 1;

/// Protocol constants fixed at deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParameters {
    pub max_interest_rate: InterestRate,
    pub min_reputation_score: Score,
    pub withdraw_interval: Duration,
    /// How long a reputation request may stay pending before it expires.
    pub request_ttl: Duration,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        ProtocolParameters {
            max_interest_rate: MAX_INTEREST_RATE,
            min_reputation_score: MIN_REPUTATION_SCORE,
            withdraw_interval: WITHDRAW_INTERVAL,
            request_ttl: REQUEST_TTL,
        }
    }
}
