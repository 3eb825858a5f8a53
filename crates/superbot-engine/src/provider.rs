use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use superbot_cache::CacheReader;
use superbot_models::request::AnalysisRequest;
use superbot_models::signals::SignalKind;
use tracing::debug;

use crate::error::AgentError;

/// A market-signal source. Mockable for testing.
///
/// Each provider owns one analysis slot of the run. Timeouts are applied by the
/// scheduler, so implementations may simply await their I/O.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    type Output: Send + 'static;

    fn name(&self) -> &str;
    fn kind(&self) -> SignalKind;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<Self::Output, AgentError>;
}

/// Reads the latest record an external pipeline wrote for the request's primary symbol.
///
/// Backs the technical, support/resistance and cached fear & greed signals.
pub struct CachedSignalProvider<T> {
    kind: SignalKind,
    cache: Arc<CacheReader>,
    _record: PhantomData<fn() -> T>,
}

impl<T> CachedSignalProvider<T> {
    pub fn new(kind: SignalKind, cache: Arc<CacheReader>) -> Self {
        Self {
            kind,
            cache,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T> SignalProvider for CachedSignalProvider<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<T, AgentError> {
        let symbol = request
            .primary_symbol()
            .ok_or_else(|| AgentError::MissingData("request has no symbols".to_string()))?;

        debug!(kind = %self.kind, symbol, "Reading signal from cache");
        self.cache
            .get_signal(self.kind, symbol)
            .await?
            .ok_or_else(|| {
                AgentError::MissingData(format!("no fresh {} record for {symbol}", self.kind))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use superbot_cache::SqliteReader;
    use superbot_models::signals::{Momentum, TechnicalAnalysis};

    fn cache_with_technical() -> Arc<CacheReader> {
        let sqlite = SqliteReader::open_in_memory().unwrap();
        sqlite
            .put_signal(
                SignalKind::Technical,
                "BTCUSD",
                &serde_json::json!({
                    "trend_analysis": "SMA25 above SMA200 for 12 sessions",
                    "crossover_status": "golden_cross",
                    "momentum": "bullish",
                    "conclusion": "Uptrend intact"
                }),
                "test",
                ChronoDuration::minutes(10),
            )
            .unwrap();
        Arc::new(CacheReader::new(sqlite, 100, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn reads_record_for_primary_symbol() {
        let provider: CachedSignalProvider<TechnicalAnalysis> =
            CachedSignalProvider::new(SignalKind::Technical, cache_with_technical());

        let request = AnalysisRequest::new(vec!["BTCUSD".into(), "ETHUSD".into()], 10);
        let analysis = provider.analyze(&request).await.unwrap();
        assert_eq!(analysis.momentum, Momentum::Bullish);
        assert_eq!(provider.name(), "technical");
    }

    #[tokio::test]
    async fn missing_record_is_an_error() {
        let provider: CachedSignalProvider<TechnicalAnalysis> =
            CachedSignalProvider::new(SignalKind::Technical, cache_with_technical());

        let err = provider
            .analyze(&AnalysisRequest::single("SOLUSD"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingData(ref m) if m.contains("SOLUSD")));
    }
}
