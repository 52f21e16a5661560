use std::{fmt, io, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Relay outbox row, one per reputation request id.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Reputation_Outbox {
    pub id: i64,
    pub target: String,
    pub status: String,
    pub score: Option<i64>,
    pub submitted: bool,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub seen_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub forwarded_at: Option<DateTime<Utc>>,
}

impl Reputation_Outbox {
    pub fn seen(id: i64, target: String, at: DateTime<Utc>) -> Self {
        Reputation_Outbox {
            id,
            target,
            status: OutboxStatus::Seen.to_string(),
            score: None,
            submitted: false,
            attempts: 0,
            last_error: None,
            seen_at: at,
            next_attempt_at: at,
            claimed_at: None,
            forwarded_at: None,
        }
    }

    pub fn outbox_status(&self) -> Result<OutboxStatus, io::Error> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Relay_Cursor {
    pub name: String,
    pub sequence: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Seen,
    Forwarding,
    Forwarded,
    Failed,
}

impl OutboxStatus {
    pub const ALL: [OutboxStatus; 4] = [
        OutboxStatus::Seen,
        OutboxStatus::Forwarding,
        OutboxStatus::Forwarded,
        OutboxStatus::Failed,
    ];
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutboxStatus::Seen => write!(f, "seen"),
            OutboxStatus::Forwarding => write!(f, "forwarding"),
            OutboxStatus::Forwarded => write!(f, "forwarded"),
            OutboxStatus::Failed => write!(f, "failed"),
        }
    }
}

impl From<OutboxStatus> for String {
    fn from(value: OutboxStatus) -> Self {
        value.to_string()
    }
}

impl FromStr for OutboxStatus {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<OutboxStatus, Self::Err> {
        match value {
            "seen" => Ok(OutboxStatus::Seen),
            "forwarding" => Ok(OutboxStatus::Forwarding),
            "forwarded" => Ok(OutboxStatus::Forwarded),
            "failed" => Ok(OutboxStatus::Failed),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "Outbox status not supported",
            )),
        }
    }
}
