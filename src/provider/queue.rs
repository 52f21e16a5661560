use std::future::Future;

use reqwest::StatusCode;
use tracing::debug;

use crate::{configuration::Config, error::Error, types::QueueMessage};

pub const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Durable queue the relay hands finished results to. Publishing the same
/// message id twice must be harmless.
pub trait QueuePublisher: Send + Sync {
    fn publish(
        &self,
        message: &QueueMessage,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpQueue {
    client: reqwest::Client,
    url: String,
}

impl HttpQueue {
    pub fn new(config: &Config) -> Result<HttpQueue, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(HttpQueue {
            client,
            url: config.queue_url.to_owned(),
        })
    }
}

impl QueuePublisher for HttpQueue {
    async fn publish(&self, message: &QueueMessage) -> Result<(), Error> {
        let response = self
            .client
            .post(&self.url)
            .header(IDEMPOTENCY_KEY, message.id.to_string())
            .json(message)
            .send()
            .await?;

        let status = response.status();

        // the queue answers 409 for an id it already holds
        if status.is_success() || status == StatusCode::CONFLICT {
            debug!("Queued result for request {}", message.id);
            return Ok(());
        }

        Err(Error::Queue(format!(
            "publish of {} failed with {}",
            message.id, status
        )))
    }
}
