use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    dao::OutboxStore, error::Error, model::Reputation_Outbox,
    types::CheckReputation_Type,
};

/// Records a new reputation request. Returns `false` for an id the outbox
/// already holds.
pub async fn parse_and_insert<S: OutboxStore>(
    store: &S,
    item: CheckReputation_Type,
    at: DateTime<Utc>,
) -> Result<bool, Error> {
    let id: i64 = item.id.parse()?;
    let row = Reputation_Outbox::seen(id, item.target, at);
    let inserted = store.insert_seen(row).await?;

    if inserted {
        info!("Reputation request {} seen", id);
    } else {
        debug!("Duplicate reputation request {} discarded", id);
    }

    Ok(inserted)
}
