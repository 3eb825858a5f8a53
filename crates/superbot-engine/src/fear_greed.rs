use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use superbot_models::request::AnalysisRequest;
use superbot_models::signals::{FearGreedReading, SignalKind};
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::provider::SignalProvider;

pub const DEFAULT_FEAR_GREED_URL: &str = "https://api.alternative.me";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// `GET /fng/` response body. Only the fields we read.
#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    /// Numeric string, e.g. `"74"`.
    value: String,
    value_classification: String,
}

/// Fear & Greed reading from the public alternative.me index.
pub struct HttpFearGreedProvider {
    client: Client,
    base_url: String,
}

impl HttpFearGreedProvider {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SignalProvider for HttpFearGreedProvider {
    type Output = FearGreedReading;

    fn name(&self) -> &str {
        "fear_greed_http"
    }

    fn kind(&self) -> SignalKind {
        SignalKind::FearGreed
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<FearGreedReading, AgentError> {
        let url = format!("{}/fng/", self.base_url);
        debug!(%url, "Fetching Fear & Greed index");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Fear & Greed index request failed");
            return Err(AgentError::MissingData(format!(
                "Fear & Greed index returned {status}"
            )));
        }

        let body: FngResponse = response.json().await?;
        parse_reading(body)
    }
}

fn parse_reading(body: FngResponse) -> Result<FearGreedReading, AgentError> {
    let entry = body
        .data
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::MissingData("Fear & Greed index returned no data".to_string()))?;

    let index: u8 = entry
        .value
        .trim()
        .parse()
        .map_err(|e| AgentError::Parse(format!("Fear & Greed value {:?}: {e}", entry.value)))?;
    if index > 100 {
        return Err(AgentError::Parse(format!(
            "Fear & Greed value {index} outside 0-100"
        )));
    }

    Ok(FearGreedReading {
        index,
        classification: entry.value_classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const BODY: &str = r#"{
        "name": "Fear and Greed Index",
        "data": [
            {"value": "74", "value_classification": "Greed", "timestamp": "1733961600", "time_until_update": "3600"}
        ],
        "metadata": {"error": null}
    }"#;

    #[tokio::test]
    async fn fetches_latest_reading() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fng/")
            .match_query(Matcher::UrlEncoded("limit".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let provider = HttpFearGreedProvider::new(&server.url(), None).unwrap();
        let reading = provider
            .analyze(&AnalysisRequest::single("BTCUSD"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reading.index, 74);
        assert_eq!(reading.classification, "Greed");
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fng/")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let provider = HttpFearGreedProvider::new(&server.url(), None).unwrap();
        let err = provider
            .analyze(&AnalysisRequest::single("BTCUSD"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn rejects_empty_and_out_of_range() {
        let empty: FngResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(parse_reading(empty), Err(AgentError::MissingData(_))));

        let bad: FngResponse = serde_json::from_str(
            r#"{"data": [{"value": "140", "value_classification": "Extreme Greed"}]}"#,
        )
        .unwrap();
        assert!(matches!(parse_reading(bad), Err(AgentError::Parse(_))));

        let not_a_number: FngResponse = serde_json::from_str(
            r#"{"data": [{"value": "n/a", "value_classification": "Neutral"}]}"#,
        )
        .unwrap();
        assert!(matches!(parse_reading(not_a_number), Err(AgentError::Parse(_))));
    }
}
