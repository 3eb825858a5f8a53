use std::time::Duration;

use thiserror::Error;

/// Failure of a single provider, stage or notifier call.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No data: {0}")]
    MissingData(String),

    #[error("Cache error: {0}")]
    Cache(#[from] superbot_cache::CacheError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors `Engine::execute` and plan construction return to the caller.
/// Anything that happens after validation is reported inside the response instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("engine initialization failed: {0}")]
    Initialization(String),
}
