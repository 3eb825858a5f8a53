use serde::{Deserialize, Serialize};

use crate::signals::SignalKind;

/// Categories for organizing cache keys.
/// Signal pipelines use these when writing to the shared SQLite cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    News,
    Technical,
    FearGreed,
    SupportResistance,
}

impl From<SignalKind> for CacheCategory {
    fn from(kind: SignalKind) -> Self {
        match kind {
            SignalKind::News => CacheCategory::News,
            SignalKind::Technical => CacheCategory::Technical,
            SignalKind::FearGreed => CacheCategory::FearGreed,
            SignalKind::SupportResistance => CacheCategory::SupportResistance,
        }
    }
}

/// The SQLite table signal pipelines write to and superbot reads from.
pub const CACHE_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS cache_entries (
    key         TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    value_json  TEXT NOT NULL,
    source      TEXT NOT NULL,
    symbol      TEXT,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cache_category ON cache_entries(category);
CREATE INDEX IF NOT EXISTS idx_cache_symbol ON cache_entries(symbol);
CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache_entries(expires_at);
";

/// Snapshots of finished runs, one row per run.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS run_snapshots (
///     run_id         TEXT PRIMARY KEY,
///     symbols        TEXT NOT NULL,   -- comma separated
///     success        INTEGER NOT NULL,
///     direction      TEXT,            -- buy | sell | hold, NULL without a decision
///     response_json  TEXT NOT NULL,
///     created_at     TEXT NOT NULL
/// );
/// ```
pub const RUN_SNAPSHOT_DDL: &str = "\
CREATE TABLE IF NOT EXISTS run_snapshots (
    run_id         TEXT PRIMARY KEY,
    symbols        TEXT NOT NULL,
    success        INTEGER NOT NULL,
    direction      TEXT,
    response_json  TEXT NOT NULL,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_runs_created ON run_snapshots(created_at);
";

/// Key pattern conventions for the cache.
///
/// - Per-symbol signals: `signal:{kind}:{symbol}` (e.g., `signal:technical:BTCUSD`)
/// - Market-wide signals: `signal:{kind}:market` (e.g., `signal:fear_greed:market`)
/// - Raw news items: `news:headlines:{symbol}` (e.g., `news:headlines:ETHUSD`)
pub mod key_patterns {
    use crate::signals::SignalKind;

    pub const MARKET_SCOPE: &str = "market";

    pub fn signal(kind: SignalKind, symbol: &str) -> String {
        format!("signal:{}:{symbol}", kind.as_str())
    }

    pub fn market_wide(kind: SignalKind) -> String {
        format!("signal:{}:{MARKET_SCOPE}", kind.as_str())
    }

    pub fn headlines(symbol: &str) -> String {
        format!("news:headlines:{symbol}")
    }

    /// The key a provider of `kind` reads for `symbol`.
    pub fn for_kind(kind: SignalKind, symbol: &str) -> String {
        if kind.is_market_wide() {
            market_wide(kind)
        } else {
            signal(kind, symbol)
        }
    }
}

/// A raw cache row as read from SQLite.
#[derive(Debug, Clone)]
pub struct CacheRow {
    pub key: String,
    pub category: String,
    pub value_json: String,
    pub source: String,
    pub symbol: Option<String>,
    pub created_at: String,
    pub expires_at: String,
    pub updated_at: String,
}
