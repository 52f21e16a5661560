pub use self::{
    chain::{parse_rpc_error, ChainClient, LedgerClient},
    database::DatabasePool,
    event::{Relay, RelaySettings},
    local::LocalChain,
    oracle::{score_from_response, HttpOracle, ScoringOracle},
    queue::{HttpQueue, QueuePublisher, IDEMPOTENCY_KEY},
};

mod chain;
mod database;
mod event;
mod local;
mod oracle;
mod queue;
