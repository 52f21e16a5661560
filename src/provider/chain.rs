use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    configuration::Config,
    error::Error,
    protocol::{ProtocolError, RequestId, Score},
    types::{ChainEvent, RpcError, RpcRequest, RpcResponse},
};

/// Calls the relay makes against the ledger hosting the lending contracts.
/// Contract rejections surface as `Error::Protocol`.
pub trait LedgerClient: Send + Sync {
    /// Events with a sequence strictly greater than `cursor`, oldest first.
    fn get_events(
        &self,
        cursor: u64,
        limit: u16,
    ) -> impl Future<Output = Result<Vec<ChainEvent>, Error>> + Send;

    fn receive_reputation_score(
        &self,
        from: &str,
        id: RequestId,
        score: Score,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn check_reputation(
        &self,
        from: &str,
        target: &str,
    ) -> impl Future<Output = Result<RequestId, Error>> + Send;
}

/// JSON-RPC 2.0 client for a remote ledger node.
#[derive(Debug, Clone)]
pub struct ChainClient {
    client: reqwest::Client,
    url: Url,
    request_id: Arc<AtomicU64>,
}

impl ChainClient {
    pub fn new(config: &Config) -> Result<ChainClient, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let url = Url::parse(config.ledger_rpc_url.as_str())
            .context("Invalid ledger rpc url")?;

        Ok(ChainClient {
            client,
            url,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<Option<R>, Error>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("Rpc call {} #{}", method, request.id);

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<RpcResponse<R>>()
            .await?;

        if let Some(error) = response.error {
            return Err(parse_rpc_error(error));
        }

        Ok(response.result)
    }
}

impl LedgerClient for ChainClient {
    async fn get_events(
        &self,
        cursor: u64,
        limit: u16,
    ) -> Result<Vec<ChainEvent>, Error> {
        let events: Option<Vec<ChainEvent>> =
            self.call("lender_getEvents", (cursor, limit)).await?;
        Ok(events.unwrap_or_default())
    }

    async fn receive_reputation_score(
        &self,
        from: &str,
        id: RequestId,
        score: Score,
    ) -> Result<(), Error> {
        let _: Option<Value> = self
            .call("lender_receiveReputationScore", (from, id, score))
            .await?;
        Ok(())
    }

    async fn check_reputation(
        &self,
        from: &str,
        target: &str,
    ) -> Result<RequestId, Error> {
        let id: Option<RequestId> =
            self.call("lender_checkReputation", (from, target)).await?;
        id.ok_or_else(|| Error::FieldNotExist(String::from("result")))
    }
}

/// Maps an RPC error to a protocol rejection when its data carries a known
/// failure code.
pub fn parse_rpc_error(error: RpcError) -> Error {
    if let Some(Value::String(code)) = &error.data {
        if let Ok(protocol_error) = code.parse::<ProtocolError>() {
            return Error::Protocol(protocol_error);
        }
    }

    Error::Rpc {
        code: error.code,
        message: error.message,
    }
}
