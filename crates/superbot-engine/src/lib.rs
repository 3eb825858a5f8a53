pub mod analysis;
pub mod assembler;
pub mod claude_cli;
pub mod controller;
pub mod error;
pub mod fear_greed;
pub mod news;
pub mod notifier;
pub mod parser;
pub mod plan;
pub mod prompts;
pub mod provider;
pub mod reasoning;
pub mod sink;
pub mod stage;
pub mod state;

pub mod test_support;

pub use analysis::{run_analysis_phase, AnalysisOutcome};
pub use assembler::to_response;
pub use controller::Engine;
pub use error::{AgentError, EngineError};
pub use fear_greed::HttpFearGreedProvider;
pub use news::{CachedNewsProvider, ClaudeHeadlineAnalyst, HeadlineAnalyst};
pub use notifier::{DecisionNotice, LogNotifier, Notifier, WebhookNotifier};
pub use plan::{Committee, ExecutionPlan, PlanLimits, PlanRegistry, PlanState, SignalProviders};
pub use provider::{CachedSignalProvider, SignalProvider};
pub use reasoning::run_reasoning_phase;
pub use sink::{RunSink, RunStoreSink};
pub use stage::{ClaudeStage, ReasoningStage};
pub use state::{RunState, RunStatus};
