use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use superbot_models::committee::{ExecutorDecision, SkepticCritique, StrategistProposal};
use superbot_models::config::EngineConfig;
use superbot_models::request::{MAX_NEWS_LIMIT, MAX_SYMBOLS};
use superbot_models::signals::{
    FearGreedReading, NewsAnalysis, SupportResistanceLevels, TechnicalAnalysis,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::EngineError;
use crate::notifier::Notifier;
use crate::provider::SignalProvider;
use crate::stage::ReasoningStage;

/// The four analysis branches. Unordered among themselves.
pub struct SignalProviders {
    pub news: Arc<dyn SignalProvider<Output = NewsAnalysis>>,
    pub technical: Arc<dyn SignalProvider<Output = TechnicalAnalysis>>,
    pub fear_greed: Arc<dyn SignalProvider<Output = FearGreedReading>>,
    pub support_resistance: Arc<dyn SignalProvider<Output = SupportResistanceLevels>>,
}

/// The reasoning stages, run strictly in field order.
pub struct Committee {
    pub strategist: Arc<dyn ReasoningStage<Output = StrategistProposal>>,
    pub skeptic: Arc<dyn ReasoningStage<Output = SkepticCritique>>,
    pub executor: Arc<dyn ReasoningStage<Output = ExecutorDecision>>,
}

/// Timeouts and request bounds applied to every run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanLimits {
    pub branch_timeout: Duration,
    pub reasoning_timeout: Duration,
    pub notification_timeout: Duration,
    pub max_symbols: usize,
    pub max_news_limit: u32,
}

impl From<&EngineConfig> for PlanLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            branch_timeout: Duration::from_secs(config.branch_timeout_seconds),
            reasoning_timeout: Duration::from_secs(config.reasoning_timeout_seconds),
            notification_timeout: Duration::from_secs(config.notification_timeout_seconds),
            max_symbols: config.max_symbols.clamp(1, MAX_SYMBOLS),
            max_news_limit: config.max_news_limit.clamp(1, MAX_NEWS_LIMIT),
        }
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// The static workflow every run follows: analysis branches, then the
/// committee, then the notifier. Built once and shared read-only across runs.
pub struct ExecutionPlan {
    pub signals: SignalProviders,
    pub committee: Committee,
    pub notifier: Arc<dyn Notifier>,
    pub limits: PlanLimits,
}

/// Initialization state of a [`PlanRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Uninitialized,
    Ready,
}

/// Initialize-once holder for the process-wide [`ExecutionPlan`].
///
/// The transition `Uninitialized -> Ready` happens at most once. Concurrent
/// callers of [`get_or_try_init`](Self::get_or_try_init) wait for the single
/// in-flight initialization; a failed initialization leaves the registry
/// uninitialized so a later call can retry.
pub struct PlanRegistry {
    cell: OnceCell<Arc<ExecutionPlan>>,
}

impl PlanRegistry {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub fn state(&self) -> PlanState {
        if self.cell.initialized() {
            PlanState::Ready
        } else {
            PlanState::Uninitialized
        }
    }

    pub fn get(&self) -> Option<Arc<ExecutionPlan>> {
        self.cell.get().cloned()
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<ExecutionPlan>, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExecutionPlan, EngineError>>,
    {
        let plan = self
            .cell
            .get_or_try_init(|| async move {
                let plan = init().await?;
                info!(
                    branch_timeout_ms = plan.limits.branch_timeout.as_millis() as u64,
                    reasoning_timeout_ms = plan.limits.reasoning_timeout.as_millis() as u64,
                    notifier = plan.notifier.name(),
                    "Execution plan ready"
                );
                Ok::<_, EngineError>(Arc::new(plan))
            })
            .await?;
        Ok(Arc::clone(plan))
    }
}

impl Default for PlanRegistry {
    fn default() -> Self {
        Self::new()
    }
}
