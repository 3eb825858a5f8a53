use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use superbot_models::cache_schema::key_patterns;
use superbot_models::signals::SignalKind;

use crate::error::CacheError;
use crate::memory::MemoryCache;
use crate::sqlite::SqliteReader;

/// Read-through cache: checks moka (hot) → SQLite (shared) → None.
///
/// On SQLite hit, promotes the entry to the moka hot cache for subsequent fast access.
/// SQLite access is synchronized via `Mutex` since `rusqlite::Connection` is not `Sync`.
pub struct CacheReader {
    memory: MemoryCache,
    sqlite: Mutex<SqliteReader>,
}

impl CacheReader {
    pub fn new(sqlite: SqliteReader, max_capacity: u64, memory_ttl: Duration) -> Self {
        Self {
            memory: MemoryCache::new(max_capacity, memory_ttl),
            sqlite: Mutex::new(sqlite),
        }
    }

    /// Get a typed value by cache key.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_json(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Get the raw JSON document for a cache key.
    /// Checks moka first, then SQLite. Promotes SQLite hits to moka.
    pub async fn get_json(&self, key: &str) -> Result<Option<Arc<str>>, CacheError> {
        if let Some(json) = self.memory.get(key).await {
            return Ok(Some(json));
        }

        // TTL filtering happens in the query
        let row = {
            let sqlite = self
                .sqlite
                .lock()
                .map_err(|e| CacheError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            sqlite.get(key)?
        };

        match row {
            Some(row) => {
                let json: Arc<str> = Arc::from(row.value_json);
                self.memory.insert(key.to_string(), json.clone()).await;
                Ok(Some(json))
            }
            None => Ok(None),
        }
    }

    /// Read the latest record of `kind` for `symbol`.
    /// Market-wide kinds ignore the symbol.
    pub async fn get_signal<T: DeserializeOwned>(
        &self,
        kind: SignalKind,
        symbol: &str,
    ) -> Result<Option<T>, CacheError> {
        self.get(&key_patterns::for_kind(kind, symbol)).await
    }

    /// Number of entries in the hot moka tier.
    pub async fn hot_cache_size(&self) -> u64 {
        self.memory.entry_count().await
    }
}
