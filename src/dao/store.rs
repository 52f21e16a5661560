use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
    error::Error,
    model::{OutboxStatus, Reputation_Outbox},
};

/// Cursor row tracking the last ledger event sequence the relay stored.
pub const LEDGER_CURSOR: &str = "ledger";

/// Persistence used by the relay: the outbox keyed by request id and the
/// event cursor.
pub trait OutboxStore: Send + Sync {
    /// Stores a new `seen` row. Returns `false` if the id is already known,
    /// in any status.
    fn insert_seen(
        &self,
        row: Reputation_Outbox,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Records that the score for `id` is already on the ledger.
    fn mark_submitted(
        &self,
        id: i64,
        score: i64,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Claims up to `limit` `seen` rows first seen at or before `seen_before`
    /// whose next attempt is due at `now`.
    fn claim_due(
        &self,
        seen_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Reputation_Outbox>, Error>> + Send;

    fn store_score(
        &self,
        id: i64,
        score: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn set_submitted(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn mark_forwarded(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Releases the claim and schedules another attempt.
    fn reschedule(
        &self,
        id: i64,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn mark_failed(
        &self,
        id: i64,
        error: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn recover_stale(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    fn get(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Reputation_Outbox>, Error>> + Send;

    fn get_by_status(
        &self,
        status: OutboxStatus,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Reputation_Outbox>, Error>> + Send;

    fn count_by_status(
        &self,
    ) -> impl Future<Output = Result<Vec<(String, i64)>, Error>> + Send;

    fn get_cursor(&self) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Moves the cursor forward. A lower sequence than the stored one is
    /// ignored.
    fn set_cursor(
        &self,
        sequence: u64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
