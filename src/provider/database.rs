use chrono::{DateTime, Utc};

use crate::{
    configuration::Config,
    dao::{OutboxStore, PoolOption, PoolType, LEDGER_CURSOR},
    error::Error,
    model::{OutboxStatus, Relay_Cursor, Reputation_Outbox, Table},
};

#[derive(Debug, Clone)]
pub struct DatabasePool {
    pub reputation_outbox: Table<Reputation_Outbox>,
    pub relay_cursor: Table<Relay_Cursor>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .after_connect(|_conn, _meta| Box::pin(async move { Ok(()) }))
            .max_connections(config.max_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            reputation_outbox: Table::new(pool.clone()),
            relay_cursor: Table::new(pool.clone()),
            pool,
        })
    }
}

impl OutboxStore for DatabasePool {
    async fn insert_seen(&self, row: Reputation_Outbox) -> Result<bool, Error> {
        Ok(self.reputation_outbox.insert_if_absent(&row).await?)
    }

    async fn mark_submitted(&self, id: i64, score: i64) -> Result<bool, Error> {
        Ok(self.reputation_outbox.mark_submitted(id, score).await?)
    }

    async fn claim_due(
        &self,
        seen_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Reputation_Outbox>, Error> {
        Ok(self
            .reputation_outbox
            .claim_due(seen_before, now, limit)
            .await?)
    }

    async fn store_score(&self, id: i64, score: i64) -> Result<(), Error> {
        Ok(self.reputation_outbox.store_score(id, score).await?)
    }

    async fn set_submitted(&self, id: i64) -> Result<(), Error> {
        Ok(self.reputation_outbox.set_submitted(id).await?)
    }

    async fn mark_forwarded(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error> {
        Ok(self.reputation_outbox.mark_forwarded(id, at).await?)
    }

    async fn reschedule(
        &self,
        id: i64,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), Error> {
        Ok(self
            .reputation_outbox
            .reschedule(id, next_attempt_at, error)
            .await?)
    }

    async fn mark_failed(&self, id: i64, error: &str) -> Result<(), Error> {
        Ok(self.reputation_outbox.mark_failed(id, error).await?)
    }

    async fn recover_stale(&self, claimed_before: DateTime<Utc>) -> Result<u64, Error> {
        Ok(self.reputation_outbox.recover_stale(claimed_before).await?)
    }

    async fn get(&self, id: i64) -> Result<Option<Reputation_Outbox>, Error> {
        Ok(self.reputation_outbox.get_one(id).await?)
    }

    async fn get_by_status(
        &self,
        status: OutboxStatus,
        limit: i64,
    ) -> Result<Vec<Reputation_Outbox>, Error> {
        Ok(self.reputation_outbox.get_by_status(status, limit).await?)
    }

    async fn count_by_status(&self) -> Result<Vec<(String, i64)>, Error> {
        Ok(self.reputation_outbox.count_by_status().await?)
    }

    async fn get_cursor(&self) -> Result<u64, Error> {
        let cursor = self.relay_cursor.get_one(LEDGER_CURSOR).await?;
        match cursor {
            Some(item) => Ok(u64::try_from(item.sequence)?),
            None => Ok(0),
        }
    }

    async fn set_cursor(&self, sequence: u64, at: DateTime<Utc>) -> Result<(), Error> {
        self.relay_cursor
            .upsert(Relay_Cursor {
                name: String::from(LEDGER_CURSOR),
                sequence: i64::try_from(sequence)?,
                updated_at: at,
            })
            .await?;
        Ok(())
    }
}
