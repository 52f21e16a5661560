use std::future::Future;

use tracing::debug;

use crate::{
    configuration::Config,
    error::Error,
    protocol::Score,
    types::MinersResponse,
};

/// Source of reputation scores for storage provider addresses.
pub trait ScoringOracle: Send + Sync {
    fn get_score(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Score, Error>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    config: Config,
}

impl HttpOracle {
    pub fn new(config: Config) -> Result<HttpOracle, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(HttpOracle { client, config })
    }

    pub async fn get_miners(&self, address: &str) -> Result<MinersResponse, Error> {
        let url = self.config.get_miners_url(address)?;
        debug!("{}", &url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Oracle(format!("{} returned {}", url, status)));
        }

        Ok(response.json::<MinersResponse>().await?)
    }
}

impl ScoringOracle for HttpOracle {
    async fn get_score(&self, address: &str) -> Result<Score, Error> {
        let response = self.get_miners(address).await?;
        score_from_response(address, &response)
    }
}

/// Score of the entry matching `address`. Unknown or unreachable miners
/// score zero.
pub fn score_from_response(
    address: &str,
    response: &MinersResponse,
) -> Result<Score, Error> {
    let miner = response
        .miners
        .iter()
        .find(|miner| miner.address.eq_ignore_ascii_case(address));

    match miner {
        Some(miner) if miner.is_reachable() => miner.score.value(),
        _ => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> MinersResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn reachable_miner_uses_its_score() {
        let body = response(
            r#"{"miners": [
                {"address": "f09999", "score": "12", "reachability": "reachable"},
                {"address": "f01234", "score": "87", "reachability": "reachable"}
            ]}"#,
        );
        assert_eq!(score_from_response("f01234", &body).unwrap(), 87);
    }

    #[test]
    fn numeric_and_fractional_scores() {
        let body = response(
            r#"{"miners": [{"address": "f01234", "score": 64.9, "reachability": "reachable"}]}"#,
        );
        assert_eq!(score_from_response("f01234", &body).unwrap(), 64);
    }

    #[test]
    fn unknown_or_unreachable_miner_scores_zero() {
        let unreachable = response(
            r#"{"miners": [{"address": "f01234", "score": "90", "reachability": "unreachable"}]}"#,
        );
        assert_eq!(score_from_response("f01234", &unreachable).unwrap(), 0);

        let empty = response(r#"{"miners": []}"#);
        assert_eq!(score_from_response("f01234", &empty).unwrap(), 0);

        let missing = response("{}");
        assert_eq!(score_from_response("f01234", &missing).unwrap(), 0);
    }

    #[test]
    fn malformed_score_is_an_error() {
        let body = response(
            r#"{"miners": [{"address": "f01234", "score": "n/a", "reachability": "reachable"}]}"#,
        );
        assert!(matches!(
            score_from_response("f01234", &body),
            Err(Error::ParseMessage(_))
        ));
    }
}
