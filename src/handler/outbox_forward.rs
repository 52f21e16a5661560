use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    dao::OutboxStore,
    error::Error,
    helpers::backoff_delay,
    model::Reputation_Outbox,
    protocol::ProtocolError,
    provider::{LedgerClient, QueuePublisher, RelaySettings, ScoringOracle},
    types::QueueMessage,
};

/// Runs the remaining forwarding steps for a claimed row: fetch the score,
/// submit it to the ledger, publish it. Each finished step is stored so a
/// later attempt resumes after it.
pub async fn deliver<S, L, O, Q>(
    store: &S,
    ledger: &L,
    oracle: &O,
    queue: &Q,
    oracle_account: &str,
    row: &Reputation_Outbox,
) -> Result<(), Error>
where
    S: OutboxStore,
    L: LedgerClient,
    O: ScoringOracle,
    Q: QueuePublisher,
{
    let id = u64::try_from(row.id)?;

    let score = match row.score {
        Some(score) => u32::try_from(score)?,
        None => {
            let score = oracle.get_score(&row.target).await?;
            store.store_score(row.id, i64::from(score)).await?;
            score
        },
    };

    if !row.submitted {
        match ledger
            .receive_reputation_score(oracle_account, id, score)
            .await
        {
            Ok(()) => {},
            Err(Error::Protocol(ProtocolError::Already_Received)) => {
                info!("Score for request {} already on the ledger", id);
            },
            Err(e) => return Err(e),
        }
        store.set_submitted(row.id).await?;
    }

    queue
        .publish(&QueueMessage {
            id,
            address: row.target.to_owned(),
            response: score,
        })
        .await
}

/// Stores the outcome of one forwarding attempt.
pub async fn settle<S: OutboxStore>(
    store: &S,
    settings: &RelaySettings,
    row: &Reputation_Outbox,
    outcome: Result<(), Error>,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    let error = match outcome {
        Ok(()) => {
            store.mark_forwarded(row.id, now).await?;
            info!("Reputation request {} forwarded", row.id);
            return Ok(());
        },
        Err(error) => error,
    };

    let attempts = u32::try_from(row.attempts)?.saturating_add(1);
    let message = error.to_string();

    if error.is_transient() && attempts < u32::from(settings.max_attempts) {
        let delay = backoff_delay(
            attempts,
            settings.backoff_base,
            settings.backoff_max,
        );
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        warn!(
            "Reputation request {} attempt {} failed: {}, retry in {}ms",
            row.id,
            attempts,
            message,
            delay.num_milliseconds()
        );
        store.reschedule(row.id, now + delay, &message).await?;
        return Ok(());
    }

    error!(
        "Reputation request {} failed after {} attempts: {}",
        row.id, attempts, message
    );
    store.mark_failed(row.id, &message).await
}
