use tracing::debug;

use crate::{
    dao::OutboxStore, error::Error, types::ReputationReceived_Type,
};

/// Marks the request as already answered on the ledger so forwarding skips
/// the oracle and the submission.
pub async fn parse_and_update<S: OutboxStore>(
    store: &S,
    item: ReputationReceived_Type,
) -> Result<bool, Error> {
    let id: i64 = item.id.parse()?;
    let score: i64 = item.score.parse()?;
    let updated = store.mark_submitted(id, score).await?;

    if !updated {
        debug!(
            "Score for request {} ({}) received without outbox row",
            id, item.target
        );
    }

    Ok(updated)
}
