use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::chain::LedgerClient;
use crate::{
    error::Error,
    protocol::{Address, CallContext, RequestId, Runtime, Score},
    types::ChainEvent,
};

/// Ledger adapter over an in-process `Runtime`. Calls are stamped with the
/// wall clock in unix seconds.
#[derive(Debug, Clone)]
pub struct LocalChain {
    runtime: Arc<Mutex<Runtime>>,
}

impl LocalChain {
    pub fn new(runtime: Runtime) -> Self {
        LocalChain {
            runtime: Arc::new(Mutex::new(runtime)),
        }
    }

    pub fn runtime(&self) -> Arc<Mutex<Runtime>> {
        Arc::clone(&self.runtime)
    }

    fn context(from: &str) -> CallContext {
        CallContext::new(Address::new(from), Utc::now().timestamp())
    }
}

impl LedgerClient for LocalChain {
    async fn get_events(
        &self,
        cursor: u64,
        limit: u16,
    ) -> Result<Vec<ChainEvent>, Error> {
        let runtime = self.runtime.lock().await;
        let events: Vec<ChainEvent> = runtime
            .events_since(cursor, usize::from(limit))
            .iter()
            .map(ChainEvent::from)
            .collect();
        Ok(events)
    }

    async fn receive_reputation_score(
        &self,
        from: &str,
        id: RequestId,
        score: Score,
    ) -> Result<(), Error> {
        let ctx = Self::context(from);
        let mut runtime = self.runtime.lock().await;
        runtime.receive_reputation_score(&ctx, id, score)?;
        Ok(())
    }

    async fn check_reputation(
        &self,
        from: &str,
        target: &str,
    ) -> Result<RequestId, Error> {
        let ctx = Self::context(from);
        let mut runtime = self.runtime.lock().await;
        Ok(runtime.check_reputation(&ctx, Address::new(target))?)
    }
}
