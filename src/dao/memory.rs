use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::store::OutboxStore;
use crate::{
    error::Error,
    model::{OutboxStatus, Reputation_Outbox},
};

/// Outbox kept in process memory. Same semantics as the Postgres tables,
/// without durability.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    rows: Mutex<BTreeMap<i64, Reputation_Outbox>>,
    cursor: Mutex<u64>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        MemoryOutbox::default()
    }

    async fn update<F>(&self, id: i64, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Reputation_Outbox) + Send,
    {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("outbox row {}", id)))?;
        change(row);
        Ok(())
    }
}

impl OutboxStore for MemoryOutbox {
    async fn insert_seen(&self, row: Reputation_Outbox) -> Result<bool, Error> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&row.id) {
            return Ok(false);
        }
        rows.insert(row.id, row);
        Ok(true)
    }

    async fn mark_submitted(&self, id: i64, score: i64) -> Result<bool, Error> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&id) {
            Some(row) => {
                row.submitted = true;
                row.score.get_or_insert(score);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn claim_due(
        &self,
        seen_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Reputation_Outbox>, Error> {
        let limit = usize::try_from(limit)?;
        let seen = OutboxStatus::Seen.to_string();
        let mut rows = self.rows.lock().await;

        let claimed: Vec<Reputation_Outbox> = rows
            .values_mut()
            .filter(|row| {
                row.status == seen
                    && row.seen_at <= seen_before
                    && row.next_attempt_at <= now
            })
            .take(limit)
            .map(|row| {
                row.status = OutboxStatus::Forwarding.to_string();
                row.claimed_at = Some(now);
                row.clone()
            })
            .collect();

        Ok(claimed)
    }

    async fn store_score(&self, id: i64, score: i64) -> Result<(), Error> {
        self.update(id, |row| row.score = Some(score)).await
    }

    async fn set_submitted(&self, id: i64) -> Result<(), Error> {
        self.update(id, |row| row.submitted = true).await
    }

    async fn mark_forwarded(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error> {
        self.update(id, |row| {
            row.status = OutboxStatus::Forwarded.to_string();
            row.forwarded_at = Some(at);
            row.claimed_at = None;
            row.last_error = None;
        })
        .await
    }

    async fn reschedule(
        &self,
        id: i64,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), Error> {
        let error = error.to_owned();
        self.update(id, move |row| {
            row.status = OutboxStatus::Seen.to_string();
            row.attempts += 1;
            row.next_attempt_at = next_attempt_at;
            row.last_error = Some(error);
            row.claimed_at = None;
        })
        .await
    }

    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), Error> {
        let error = error.to_owned();
        self.update(id, move |row| {
            row.status = OutboxStatus::Failed.to_string();
            row.attempts += 1;
            row.last_error = Some(error);
            row.claimed_at = None;
        })
        .await
    }

    async fn recover_stale(&self, claimed_before: DateTime<Utc>) -> Result<u64, Error> {
        let forwarding = OutboxStatus::Forwarding.to_string();
        let mut rows = self.rows.lock().await;
        let mut recovered = 0;

        for row in rows.values_mut() {
            let stale = row
                .claimed_at
                .map(|at| at < claimed_before)
                .unwrap_or(false);

            if row.status == forwarding && stale {
                row.status = OutboxStatus::Seen.to_string();
                row.claimed_at = None;
                recovered += 1;
            }
        }

        Ok(recovered)
    }

    async fn get(&self, id: i64) -> Result<Option<Reputation_Outbox>, Error> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn get_by_status(
        &self,
        status: OutboxStatus,
        limit: i64,
    ) -> Result<Vec<Reputation_Outbox>, Error> {
        let limit = usize::try_from(limit)?;
        let status = status.to_string();
        let rows = self.rows.lock().await;

        Ok(rows
            .values()
            .filter(|row| row.status == status)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_by_status(&self) -> Result<Vec<(String, i64)>, Error> {
        let rows = self.rows.lock().await;
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();

        for row in rows.values() {
            *counts.entry(row.status.clone()).or_default() += 1;
        }

        Ok(counts.into_iter().collect())
    }

    async fn get_cursor(&self) -> Result<u64, Error> {
        Ok(*self.cursor.lock().await)
    }

    async fn set_cursor(&self, sequence: u64, _at: DateTime<Utc>) -> Result<(), Error> {
        let mut cursor = self.cursor.lock().await;
        *cursor = (*cursor).max(sequence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn row(id: i64, at: DateTime<Utc>) -> Reputation_Outbox {
        Reputation_Outbox::seen(id, format!("f0{}", id), at)
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_in_any_status() {
        let store = MemoryOutbox::new();
        let now = Utc::now();

        assert!(store.insert_seen(row(1, now)).await.unwrap());
        assert!(!store.insert_seen(row(1, now)).await.unwrap());

        store.mark_forwarded(1, now).await.unwrap();
        assert!(!store.insert_seen(row(1, now)).await.unwrap());
    }

    #[tokio::test]
    async fn claims_respect_window_and_backoff() {
        let store = MemoryOutbox::new();
        let now = Utc::now();
        store.insert_seen(row(1, now - Duration::seconds(10))).await.unwrap();
        store.insert_seen(row(2, now)).await.unwrap();

        let claimed = store
            .claim_due(now - Duration::seconds(5), now, 10)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, 1);
        assert_eq!(claimed[0].status, "forwarding");

        store
            .reschedule(1, now + Duration::seconds(30), "timeout")
            .await
            .unwrap();
        let claimed = store
            .claim_due(now - Duration::seconds(5), now, 10)
            .await
            .unwrap();
        assert!(claimed.is_empty());

        let row = store.get(1).await.unwrap().unwrap();
        assert_eq!(row.attempts, 1);
        assert_eq!(row.last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn stale_claims_return_to_seen() {
        let store = MemoryOutbox::new();
        let then = Utc::now() - Duration::minutes(10);
        store.insert_seen(row(1, then)).await.unwrap();
        store.claim_due(then, then, 10).await.unwrap();

        assert_eq!(store.recover_stale(then).await.unwrap(), 0);
        assert_eq!(store.recover_stale(Utc::now()).await.unwrap(), 1);
        assert_eq!(store.get(1).await.unwrap().unwrap().status, "seen");
    }

    #[tokio::test]
    async fn cursor_only_moves_forward() {
        let store = MemoryOutbox::new();
        store.set_cursor(9, Utc::now()).await.unwrap();
        store.set_cursor(4, Utc::now()).await.unwrap();
        assert_eq!(store.get_cursor().await.unwrap(), 9);
    }
}
