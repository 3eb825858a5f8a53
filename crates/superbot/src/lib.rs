//! SuperBot - crypto trading decision engine
//!
//! Gathers four market signals concurrently, runs them through a
//! strategist -> skeptic -> executor committee of Claude CLI stages, and
//! returns a buy/sell/hold decision with entry, stop and target levels.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use superbot::models::{AnalysisRequest, SuperbotConfig};
//!
//! # async fn run(config: SuperbotConfig) -> anyhow::Result<()> {
//! let engine = superbot::build_engine(&config).await?;
//! let response = engine.execute(AnalysisRequest::single("BTCUSD")).await?;
//! println!("{}", serde_json::to_string_pretty(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod scheduler;

pub use superbot_cache as cache;
pub use superbot_engine as engine;
pub use superbot_models as models;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use superbot_cache::{CacheReader, RunStore, SqliteReader};
use superbot_engine::claude_cli::ClaudeCliConfig;
use superbot_engine::{
    CachedNewsProvider, CachedSignalProvider, ClaudeHeadlineAnalyst, ClaudeStage, Committee,
    Engine, EngineError, ExecutionPlan, HttpFearGreedProvider, LogNotifier, Notifier, PlanLimits,
    PlanRegistry, RunStoreSink, SignalProvider, SignalProviders, WebhookNotifier,
};
use superbot_models::config::SuperbotConfig;
use superbot_models::signals::{FearGreedReading, SignalKind};
use tracing::info;

/// The process-wide execution plan.
pub static PLAN: PlanRegistry = PlanRegistry::new();

/// Read and parse a TOML configuration file.
pub fn load_config(path: &str) -> anyhow::Result<SuperbotConfig> {
    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

/// Build the execution plan: cache-backed signal providers, a Claude headline
/// summary, the Claude committee and the configured notifier.
pub fn build_plan(config: &SuperbotConfig) -> Result<ExecutionPlan, EngineError> {
    let sqlite = SqliteReader::open(&config.cache.sqlite_path).map_err(|e| {
        EngineError::Initialization(format!(
            "signal cache {}: {e}",
            config.cache.sqlite_path
        ))
    })?;
    let cache = Arc::new(CacheReader::new(
        sqlite,
        config.cache.memory_max_capacity,
        Duration::from_secs(config.cache.memory_ttl_seconds),
    ));

    let http_timeout = config.signals.http_timeout_seconds.map(Duration::from_secs);
    let fear_greed: Arc<dyn SignalProvider<Output = FearGreedReading>> =
        match &config.signals.fear_greed_url {
            Some(url) => Arc::new(HttpFearGreedProvider::new(url, http_timeout).map_err(|e| {
                EngineError::Initialization(format!("fear & greed client: {e}"))
            })?),
            None => Arc::new(CachedSignalProvider::new(SignalKind::FearGreed, cache.clone())),
        };

    let news_analyst = ClaudeHeadlineAnalyst::new(ClaudeCliConfig::for_news(
        &config.committee,
        &config.signals,
    ));

    let signals = SignalProviders {
        news: Arc::new(CachedNewsProvider::new(cache.clone(), Arc::new(news_analyst))),
        technical: Arc::new(CachedSignalProvider::new(SignalKind::Technical, cache.clone())),
        fear_greed,
        support_resistance: Arc::new(CachedSignalProvider::new(
            SignalKind::SupportResistance,
            cache,
        )),
    };

    let committee = Committee {
        strategist: Arc::new(ClaudeStage::strategist(&config.committee)),
        skeptic: Arc::new(ClaudeStage::skeptic(&config.committee)),
        executor: Arc::new(ClaudeStage::executor(&config.committee)),
    };

    let limits = PlanLimits::from(&config.engine);
    let notifier: Arc<dyn Notifier> = match &config.notification.webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url, limits.notification_timeout).map_err(|e| {
                EngineError::Initialization(format!("webhook client: {e}"))
            })?,
        ),
        None => Arc::new(LogNotifier),
    };

    Ok(ExecutionPlan {
        signals,
        committee,
        notifier,
        limits,
    })
}

/// An engine over the process-wide plan, persisting runs when the store is enabled.
///
/// The plan is built on first call; later calls reuse it regardless of `config`.
pub async fn build_engine(config: &SuperbotConfig) -> anyhow::Result<Engine> {
    let plan = PLAN
        .get_or_try_init(|| async { build_plan(config) })
        .await
        .context("Failed to build execution plan")?;

    let engine = Engine::new(plan);
    if !config.store.enabled {
        return Ok(engine);
    }

    let store = open_run_store(config)?;
    info!(path = %config.store.sqlite_path, "Run snapshots enabled");
    Ok(engine.with_sink(Arc::new(RunStoreSink::new(store))))
}

/// Open the run-snapshot store named in the configuration.
pub fn open_run_store(config: &SuperbotConfig) -> anyhow::Result<RunStore> {
    RunStore::open(&config.store.sqlite_path)
        .with_context(|| format!("Failed to open run store: {}", config.store.sqlite_path))
}
