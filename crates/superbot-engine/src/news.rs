//! News sentiment over the cached headlines of every requested symbol.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use superbot_cache::CacheReader;
use superbot_models::cache_schema::key_patterns;
use superbot_models::request::AnalysisRequest;
use superbot_models::signals::{NewsAnalysis, NewsHeadline, SignalKind};
use tracing::debug;

use crate::claude_cli::{invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;
use crate::parser::parse_stage_output;
use crate::prompts::{news_system_prompt, news_user_prompt};
use crate::provider::SignalProvider;

/// Turns a list of headlines into a sentiment summary. Mockable for testing.
#[async_trait]
pub trait HeadlineAnalyst: Send + Sync {
    async fn summarize(
        &self,
        symbols: &[String],
        headlines: &[String],
    ) -> Result<NewsAnalysis, AgentError>;
}

/// Summarizes headlines with one Claude CLI call.
pub struct ClaudeHeadlineAnalyst {
    cli_config: ClaudeCliConfig,
}

impl ClaudeHeadlineAnalyst {
    pub fn new(cli_config: ClaudeCliConfig) -> Self {
        Self { cli_config }
    }

    pub fn model(&self) -> &str {
        &self.cli_config.model
    }
}

#[async_trait]
impl HeadlineAnalyst for ClaudeHeadlineAnalyst {
    async fn summarize(
        &self,
        symbols: &[String],
        headlines: &[String],
    ) -> Result<NewsAnalysis, AgentError> {
        let user_prompt = news_user_prompt(symbols, headlines);
        let raw_output = invoke_claude(&news_system_prompt(), &user_prompt, &self.cli_config).await?;
        parse_stage_output(&raw_output)
    }
}

/// Reads the headlines the news pipeline cached for each requested symbol,
/// keeps the newest `news_limit` of them and has them summarized.
pub struct CachedNewsProvider {
    cache: Arc<CacheReader>,
    analyst: Arc<dyn HeadlineAnalyst>,
}

impl CachedNewsProvider {
    pub fn new(cache: Arc<CacheReader>, analyst: Arc<dyn HeadlineAnalyst>) -> Self {
        Self { cache, analyst }
    }
}

#[async_trait]
impl SignalProvider for CachedNewsProvider {
    type Output = NewsAnalysis;

    fn name(&self) -> &str {
        "news"
    }

    fn kind(&self) -> SignalKind {
        SignalKind::News
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<NewsAnalysis, AgentError> {
        let mut items = Vec::new();
        for symbol in &request.symbols {
            let batch: Option<Vec<NewsHeadline>> =
                self.cache.get(&key_patterns::headlines(symbol)).await?;
            match batch {
                Some(batch) => items.extend(batch),
                None => debug!(symbol = %symbol, "No cached headlines"),
            }
        }

        let headlines = latest_headlines(items, request.news_limit as usize);
        if headlines.is_empty() {
            return Err(AgentError::MissingData(format!(
                "no fresh headlines for {}",
                request.symbols.join(", ")
            )));
        }

        debug!(count = headlines.len(), limit = request.news_limit, "Summarizing headlines");
        let mut analysis = self.analyst.summarize(&request.symbols, &headlines).await?;
        analysis.headlines = headlines;
        Ok(analysis)
    }
}

/// Newest first, one entry per item id, blank items dropped, at most `limit`.
fn latest_headlines(mut items: Vec<NewsHeadline>, limit: usize) -> Vec<String> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .map(|item| item.text().to_string())
        .filter(|text| !text.is_empty())
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::Mutex;
    use std::time::Duration;
    use superbot_cache::SqliteReader;
    use superbot_models::signals::NewsSentiment;

    /// Echoes the headlines it was given back in the summary.
    #[derive(Default)]
    struct EchoAnalyst {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl HeadlineAnalyst for EchoAnalyst {
        async fn summarize(
            &self,
            symbols: &[String],
            headlines: &[String],
        ) -> Result<NewsAnalysis, AgentError> {
            self.calls.lock().unwrap().push(headlines.to_vec());
            Ok(NewsAnalysis {
                sentiment: NewsSentiment::Neutral,
                context_summary: headlines.join("; "),
                market_opinion: format!("covers {}", symbols.join(",")),
                headlines: Vec::new(),
            })
        }
    }

    fn item(id: &str, headline: &str, minute: u32) -> NewsHeadline {
        NewsHeadline {
            id: id.to_string(),
            headline: headline.to_string(),
            summary: None,
            source: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 10, 12, minute, 0).unwrap(),
        }
    }

    fn cache() -> Arc<CacheReader> {
        let sqlite = SqliteReader::open_in_memory().unwrap();
        let ttl = ChronoDuration::minutes(10);
        sqlite
            .put_headlines(
                "BTCUSD",
                &[
                    item("1", "BTC miners sell reserves", 1),
                    item("3", "Spot ETF inflows extend streak", 3),
                    item("5", "Crypto market cap tops 3T", 5),
                ],
                "test",
                ttl,
            )
            .unwrap();
        sqlite
            .put_headlines(
                "ETHUSD",
                &[
                    item("4", "ETH staking yields climb", 4),
                    item("5", "Crypto market cap tops 3T", 5),
                ],
                "test",
                ttl,
            )
            .unwrap();
        Arc::new(CacheReader::new(sqlite, 100, Duration::from_secs(60)))
    }

    fn provider() -> (CachedNewsProvider, Arc<EchoAnalyst>) {
        let analyst = Arc::new(EchoAnalyst::default());
        (CachedNewsProvider::new(cache(), analyst.clone()), analyst)
    }

    fn request(symbols: &[&str], news_limit: u32) -> AnalysisRequest {
        AnalysisRequest::new(symbols.iter().map(|s| s.to_string()).collect(), news_limit)
    }

    #[tokio::test]
    async fn news_limit_caps_the_newest_headlines() {
        let (provider, _) = provider();

        let all = provider.analyze(&request(&["BTCUSD"], 10)).await.unwrap();
        assert_eq!(all.headlines.len(), 3);

        let capped = provider.analyze(&request(&["BTCUSD"], 2)).await.unwrap();
        assert_eq!(
            capped.headlines,
            ["Crypto market cap tops 3T", "Spot ETF inflows extend streak"]
        );
        assert_eq!(
            capped.context_summary,
            "Crypto market cap tops 3T; Spot ETF inflows extend streak"
        );
    }

    #[tokio::test]
    async fn every_requested_symbol_contributes() {
        let (provider, analyst) = provider();

        let btc_only = provider.analyze(&request(&["BTCUSD"], 10)).await.unwrap();
        assert!(!btc_only.headlines.iter().any(|h| h.contains("ETH staking")));

        let both = provider
            .analyze(&request(&["BTCUSD", "ETHUSD"], 10))
            .await
            .unwrap();
        // the shared item is listed once
        assert_eq!(
            both.headlines,
            [
                "Crypto market cap tops 3T",
                "ETH staking yields climb",
                "Spot ETF inflows extend streak",
                "BTC miners sell reserves",
            ]
        );
        assert_eq!(both.market_opinion, "covers BTCUSD,ETHUSD");
        assert_eq!(analyst.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn symbol_without_headlines_is_skipped() {
        let (provider, _) = provider();

        let analysis = provider
            .analyze(&request(&["SOLUSD", "ETHUSD"], 10))
            .await
            .unwrap();
        assert_eq!(analysis.headlines.len(), 2);
    }

    #[tokio::test]
    async fn no_headlines_at_all_is_missing_data() {
        let (provider, analyst) = provider();

        let err = provider
            .analyze(&request(&["SOLUSD", "XRPUSD"], 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingData(ref m) if m.contains("SOLUSD, XRPUSD")));
        assert!(analyst.calls.lock().unwrap().is_empty());
        assert_eq!(provider.name(), "news");
    }

    #[test]
    fn blank_items_are_dropped_before_the_limit() {
        let mut blank = item("9", " ", 9);
        blank.summary = None;
        let kept = latest_headlines(vec![blank, item("2", "Older", 2), item("3", "Newer", 3)], 2);
        assert_eq!(kept, ["Newer", "Older"]);
    }
}
