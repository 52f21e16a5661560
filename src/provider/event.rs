use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use super::{chain::LedgerClient, oracle::ScoringOracle, queue::QueuePublisher};
use crate::{
    dao::OutboxStore,
    error::Error,
    handler::{outbox_forward, outbox_recovery},
    helpers::parse_event,
    model::Reputation_Outbox,
};

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub oracle_account: String,
    pub poll_interval: Duration,
    pub debounce_window: Duration,
    pub batch_size: u16,
    pub max_attempts: u16,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub recovery_threshold: Duration,
    pub recovery_interval: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            oracle_account: String::new(),
            poll_interval: Duration::from_secs(1),
            debounce_window: Duration::from_secs(5),
            batch_size: 50,
            max_attempts: 8,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(300),
            recovery_threshold: Duration::from_secs(120),
            recovery_interval: Duration::from_secs(60),
        }
    }
}

/// Bridges `CheckReputation` events to the scoring oracle, the ledger and
/// the result queue. A single task owns the outbox.
#[derive(Debug)]
pub struct Relay<S, L, O, Q> {
    store: S,
    ledger: L,
    oracle: O,
    queue: Q,
    settings: RelaySettings,
}

impl<S, L, O, Q> Relay<S, L, O, Q>
where
    S: OutboxStore,
    L: LedgerClient,
    O: ScoringOracle,
    Q: QueuePublisher,
{
    pub fn new(store: S, ledger: L, oracle: O, queue: Q, settings: RelaySettings) -> Self {
        Relay {
            store,
            ledger,
            oracle,
            queue,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub async fn run(&self) -> Result<(), Error> {
        self.recover(Utc::now()).await?;
        info!("Relay started");

        let mut poll = time::interval(self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut recovery = time::interval(self.settings.recovery_interval);
        recovery.set_missed_tick_behavior(MissedTickBehavior::Delay);
        recovery.tick().await;

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        error!("Relay tick failed with error {}", e);
                    }
                },
                _ = recovery.tick() => {
                    if let Err(e) = self.recover(Utc::now()).await {
                        error!("Outbox recovery failed with error {}", e);
                    }
                },
            }
        }
    }

    /// Ingests new ledger events, then forwards whatever is due.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<(), Error> {
        self.poll(now).await?;
        self.flush(now).await?;
        Ok(())
    }

    /// Stores events after the cursor and moves the cursor past them.
    /// Returns the number of events read.
    pub async fn poll(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let cursor = self.store.get_cursor().await?;
        let events = self
            .ledger
            .get_events(cursor, self.settings.batch_size)
            .await?;

        let mut last = cursor;

        for event in &events {
            if event.sequence <= cursor {
                continue;
            }

            if let Err(e) = parse_event(&self.store, event, now).await {
                if e.is_transient() {
                    if last > cursor {
                        self.store.set_cursor(last, now).await?;
                    }
                    return Err(e);
                }
                warn!("Skipping event {} with error {}", event.sequence, e);
            }

            last = last.max(event.sequence);
        }

        if last > cursor {
            self.store.set_cursor(last, now).await?;
        }

        Ok(events.len())
    }

    /// Forwards claimed rows. Rows are independent and run concurrently.
    /// Returns the number of rows claimed.
    pub async fn flush(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let window = chrono::Duration::from_std(self.settings.debounce_window)
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        let rows = self
            .store
            .claim_due(now - window, now, i64::from(self.settings.batch_size))
            .await?;
        let count = rows.len();

        let results = join_all(rows.iter().map(|row| self.forward(row, now))).await;
        for result in results {
            result?;
        }

        Ok(count)
    }

    pub async fn recover(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        outbox_recovery::recover(&self.store, self.settings.recovery_threshold, now)
            .await
    }

    async fn forward(&self, row: &Reputation_Outbox, now: DateTime<Utc>) -> Result<(), Error> {
        let outcome = outbox_forward::deliver(
            &self.store,
            &self.ledger,
            &self.oracle,
            &self.queue,
            &self.settings.oracle_account,
            row,
        )
        .await;

        outbox_forward::settle(&self.store, &self.settings, row, outcome, now).await
    }
}
