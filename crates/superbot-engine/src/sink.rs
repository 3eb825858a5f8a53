use std::sync::Arc;

use async_trait::async_trait;
use superbot_cache::RunStore;
use superbot_models::response::AnalysisResponse;

use crate::error::AgentError;

/// Receives every assembled response. Failures are logged by the caller and
/// never change the response.
#[async_trait]
pub trait RunSink: Send + Sync {
    async fn record(&self, response: &AnalysisResponse) -> Result<(), AgentError>;
}

/// Writes responses to a [`RunStore`] on the blocking thread pool.
#[derive(Clone)]
pub struct RunStoreSink {
    store: Arc<RunStore>,
}

impl RunStoreSink {
    pub fn new(store: RunStore) -> Self {
        Self::shared(Arc::new(store))
    }

    /// Share a store that is also read elsewhere.
    pub fn shared(store: Arc<RunStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RunSink for RunStoreSink {
    async fn record(&self, response: &AnalysisResponse) -> Result<(), AgentError> {
        let store = Arc::clone(&self.store);
        let response = response.clone();
        tokio::task::spawn_blocking(move || store.insert(&response)).await??;
        Ok(())
    }
}
