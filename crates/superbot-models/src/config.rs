use serde::{Deserialize, Serialize};

use crate::request::{DEFAULT_NEWS_LIMIT, MAX_NEWS_LIMIT, MAX_SYMBOLS};

/// Top-level configuration for superbot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuperbotConfig {
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub committee: CommitteeConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Configuration for the signal cache reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Path to the shared SQLite cache file (written by signal pipelines, read by superbot).
    pub sqlite_path: String,
    /// Maximum number of entries in the in-memory moka cache.
    pub memory_max_capacity: u64,
    /// How long a read stays in the in-memory tier.
    pub memory_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/superbot_cache.db".to_string(),
            memory_max_capacity: 1_000,
            memory_ttl_seconds: 60,
        }
    }
}

/// Timeouts and request bounds for the workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Budget for each analysis branch. A branch that overruns is recorded as failed.
    pub branch_timeout_seconds: u64,
    /// Deadline for the whole strategist -> skeptic -> executor chain.
    pub reasoning_timeout_seconds: u64,
    pub notification_timeout_seconds: u64,
    pub max_symbols: usize,
    pub max_news_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            branch_timeout_seconds: 20,
            reasoning_timeout_seconds: 120,
            notification_timeout_seconds: 15,
            max_symbols: MAX_SYMBOLS,
            max_news_limit: MAX_NEWS_LIMIT,
        }
    }
}

/// Models and timeouts for the reasoning stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommitteeConfig {
    /// Default model for every stage.
    pub model: String,
    pub strategist_model: Option<String>,
    pub skeptic_model: Option<String>,
    pub executor_model: Option<String>,
    pub stage_timeout_seconds: u64,
}

impl Default for CommitteeConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            strategist_model: None,
            skeptic_model: None,
            executor_model: None,
            stage_timeout_seconds: 45,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalsConfig {
    /// Base URL of the public Fear & Greed index (e.g. `https://api.alternative.me`).
    /// When unset the reading comes from the cache like every other signal.
    pub fear_greed_url: Option<String>,
    pub http_timeout_seconds: Option<u64>,
    /// Model that summarizes cached headlines. Falls back to the committee model.
    pub news_model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Endpoint that receives the decision as JSON. Decisions are only logged when unset.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    pub sqlite_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sqlite_path: "data/superbot_runs.db".to_string(),
        }
    }
}

/// Unattended runs at fixed local wall-clock times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub symbols: Vec<String>,
    pub news_limit: u32,
    /// `HH:MM` in the local offset below.
    pub times: Vec<String>,
    pub utc_offset_minutes: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSD".to_string()],
            news_limit: DEFAULT_NEWS_LIMIT,
            times: vec!["09:00".to_string(), "18:00".to_string()],
            utc_offset_minutes: -180,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_superbot_config() {
        let config = SuperbotConfig {
            cache: CacheConfig::default(),
            engine: EngineConfig::default(),
            committee: CommitteeConfig::default(),
            signals: SignalsConfig::default(),
            notification: NotificationConfig::default(),
            store: StoreConfig::default(),
            schedule: ScheduleConfig::default(),
        };

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SuperbotConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let toml_str = r#"
[cache]
sqlite_path = "/tmp/signals.db"
memory_max_capacity = 100
memory_ttl_seconds = 30
"#;
        let config: SuperbotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.schedule.times, vec!["09:00", "18:00"]);
        assert_eq!(config.schedule.symbols, vec!["BTCUSD"]);
        assert!(config.notification.webhook_url.is_none());
        assert!(config.store.enabled);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[cache]
sqlite_path = "/tmp/signals.db"
memory_max_capacity = 100
memory_ttl_seconds = 30

[engine]
branch_timeout_seconds = 5
reasoning_timeout_seconds = 60

[committee]
model = "claude-3-5-haiku-latest"
executor_model = "claude-sonnet-4-5-20250929"

[signals]
fear_greed_url = "https://api.alternative.me"

[notification]
webhook_url = "https://hooks.example.com/superbot"

[store]
enabled = false

[schedule]
symbols = ["BTCUSD", "ETHUSD"]
times = ["08:30"]
utc_offset_minutes = 0
"#;
        let config: SuperbotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.branch_timeout_seconds, 5);
        // unspecified engine fields keep their defaults
        assert_eq!(config.engine.notification_timeout_seconds, 15);
        assert_eq!(config.committee.model, "claude-3-5-haiku-latest");
        assert_eq!(
            config.committee.executor_model.as_deref(),
            Some("claude-sonnet-4-5-20250929")
        );
        assert!(config.committee.strategist_model.is_none());
        assert_eq!(
            config.signals.fear_greed_url.as_deref(),
            Some("https://api.alternative.me")
        );
        assert!(!config.store.enabled);
        assert_eq!(config.schedule.symbols.len(), 2);
        assert_eq!(config.schedule.news_limit, DEFAULT_NEWS_LIMIT);
    }
}
