use std::{collections::HashMap, fmt, io, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    dao::OutboxStore,
    error::Error,
    handler::{check_reputation, reputation_received},
    types::{
        Attributes, ChainEvent, CheckReputation_Type, ReputationReceived_Type,
    },
};

pub fn parse_check_reputation(
    attributes: &Vec<Attributes>,
) -> Result<CheckReputation_Type, Error> {
    let data = parse_data(attributes)?;

    let c = CheckReputation_Type {
        id: data
            .get("id")
            .ok_or(Error::FieldNotExist(String::from("id")))?
            .to_owned(),
        target: data
            .get("target")
            .ok_or(Error::FieldNotExist(String::from("target")))?
            .to_owned(),
    };

    Ok(c)
}

pub fn parse_reputation_received(
    attributes: &Vec<Attributes>,
) -> Result<ReputationReceived_Type, Error> {
    let data = parse_data(attributes)?;

    let c = ReputationReceived_Type {
        id: data
            .get("id")
            .ok_or(Error::FieldNotExist(String::from("id")))?
            .to_owned(),
        score: data
            .get("score")
            .ok_or(Error::FieldNotExist(String::from("score")))?
            .to_owned(),
        target: data
            .get("target")
            .ok_or(Error::FieldNotExist(String::from("target")))?
            .to_owned(),
    };

    Ok(c)
}

fn parse_data(
    attributes: &Vec<Attributes>,
) -> Result<HashMap<String, String>, Error> {
    let mut data: HashMap<String, String> = HashMap::new();
    for attribute in attributes {
        let value = attribute.value.to_owned().unwrap_or(String::from(""));
        let key = attribute.key.to_owned();
        if data.contains_key(&key) {
            return Err(Error::ParseMessage(format!("duplicate field {}", key)));
        }
        data.insert(key, value);
    }

    Ok(data)
}

/// Routes one ledger event to its outbox handler. Events the relay does not
/// act on are skipped.
pub async fn parse_event<S: OutboxStore>(
    store: &S,
    event: &ChainEvent,
    at: DateTime<Utc>,
) -> Result<(), Error> {
    match EventsType::from_str(&event.r#type) {
        Ok(EventsType::CheckReputation) => {
            let item = parse_check_reputation(&event.attributes)?;
            check_reputation::parse_and_insert(store, item, at).await?;
        },
        Ok(EventsType::ReputationReceived) => {
            let item = parse_reputation_received(&event.attributes)?;
            reputation_received::parse_and_update(store, item).await?;
        },
        Ok(EventsType::ClosedLoan) => {
            debug!("Loan closed by {} at {}", event.emitter, event.sequence);
        },
        Err(_) => {
            debug!("Ignoring event {} at {}", event.r#type, event.sequence);
        },
    }

    Ok(())
}

/// Delay before retry number `attempts`, doubling from `base` and capped at
/// `max`.
pub fn backoff_delay(attempts: u32, base: Duration, max: Duration) -> Duration {
    let factor = 1u32
        .checked_shl(attempts.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

#[derive(Debug, PartialEq, Eq)]
pub enum EventsType {
    CheckReputation,
    ReputationReceived,
    ClosedLoan,
}

impl fmt::Display for EventsType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventsType::CheckReputation => write!(f, "CheckReputation"),
            EventsType::ReputationReceived => write!(f, "ReputationReceived"),
            EventsType::ClosedLoan => write!(f, "ClosedLoan"),
        }
    }
}

impl From<EventsType> for String {
    fn from(value: EventsType) -> Self {
        value.to_string()
    }
}

impl FromStr for EventsType {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<EventsType, Self::Err> {
        match value {
            "CheckReputation" => Ok(EventsType::CheckReputation),
            "ReputationReceived" => Ok(EventsType::ReputationReceived),
            "ClosedLoan" => Ok(EventsType::ClosedLoan),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "Event Type not supported",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(key: &str, value: &str) -> Attributes {
        Attributes {
            key: key.to_owned(),
            value: Some(value.to_owned()),
        }
    }

    #[test]
    fn check_reputation_fields() {
        let item = parse_check_reputation(&vec![
            attribute("id", "3"),
            attribute("target", "f01234"),
        ])
        .unwrap();
        assert_eq!(item.id, "3");
        assert_eq!(item.target, "f01234");
    }

    #[test]
    fn missing_field_is_reported() {
        let result = parse_reputation_received(&vec![attribute("id", "3")]);
        assert!(matches!(result, Err(Error::FieldNotExist(field)) if field == "score"));
    }

    #[test]
    fn repeated_field_is_rejected() {
        let result = parse_check_reputation(&vec![
            attribute("id", "3"),
            attribute("id", "4"),
            attribute("target", "f01234"),
        ]);
        assert!(matches!(result, Err(Error::ParseMessage(_))));
    }

    #[test]
    fn event_names_round_trip() {
        for name in ["CheckReputation", "ReputationReceived", "ClosedLoan"] {
            assert_eq!(EventsType::from_str(name).unwrap().to_string(), name);
        }
        assert!(EventsType::from_str("Transfer").is_err());
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(5);

        assert_eq!(backoff_delay(1, base, max), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, base, max), Duration::from_secs(1));
        assert_eq!(backoff_delay(4, base, max), Duration::from_secs(4));
        assert_eq!(backoff_delay(5, base, max), max);
        assert_eq!(backoff_delay(60, base, max), max);
    }
}
