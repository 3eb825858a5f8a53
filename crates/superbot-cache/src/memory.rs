use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

/// Hot tier for signal reads, backed by moka.
///
/// Values are the raw JSON documents shared behind `Arc<str>`, so concurrent
/// runs reading the same signal do not copy it. Entries expire after the TTL.
pub struct MemoryCache {
    inner: Cache<String, Arc<str>>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<str>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, json: Arc<str>) {
        self.inner.insert(key, json).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Approximate entry count; pending maintenance is flushed first.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}
