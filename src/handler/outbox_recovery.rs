use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{dao::OutboxStore, error::Error};

/// Returns rows claimed longer than `threshold` ago to `seen`.
pub async fn recover<S: OutboxStore>(
    store: &S,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Result<u64, Error> {
    let threshold = chrono::Duration::from_std(threshold)
        .map_err(|e| Error::ConfigurationError(e.to_string()))?;
    let recovered = store.recover_stale(now - threshold).await?;

    if recovered > 0 {
        warn!("Recovered {} stale outbox claims", recovered);
    } else {
        info!("No stale outbox claims");
    }

    Ok(recovered)
}
