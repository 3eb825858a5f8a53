use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use superbot_models::request::{AnalysisRequest, MIN_NEWS_LIMIT};
use superbot_models::response::{AnalysisResponse, ErrorKind, RunError};
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::run_analysis_phase;
use crate::assembler::{final_decision, to_response};
use crate::error::EngineError;
use crate::notifier::DecisionNotice;
use crate::plan::ExecutionPlan;
use crate::reasoning::run_reasoning_phase;
use crate::sink::RunSink;
use crate::state::{RunState, RunStatus};

/// Runs the workflow for one request at a time against a shared plan.
///
/// Cheap to clone; concurrent `execute` calls share the plan and never share state.
#[derive(Clone)]
pub struct Engine {
    plan: Arc<ExecutionPlan>,
    sink: Option<Arc<dyn RunSink>>,
}

impl Engine {
    pub fn new(plan: Arc<ExecutionPlan>) -> Self {
        Self { plan, sink: None }
    }

    /// Persist every assembled response through `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn RunSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Reject requests no provider should see.
    pub fn validate(&self, request: &AnalysisRequest) -> Result<(), EngineError> {
        let limits = &self.plan.limits;

        if request.symbols.is_empty() {
            return Err(EngineError::Validation(
                "at least one symbol is required".to_string(),
            ));
        }
        if request.symbols.len() > limits.max_symbols {
            return Err(EngineError::Validation(format!(
                "at most {} symbols per request, got {}",
                limits.max_symbols,
                request.symbols.len()
            )));
        }
        if let Some(blank) = request.symbols.iter().position(|s| s.trim().is_empty()) {
            return Err(EngineError::Validation(format!(
                "symbol at position {blank} is blank"
            )));
        }
        if !(MIN_NEWS_LIMIT..=limits.max_news_limit).contains(&request.news_limit) {
            return Err(EngineError::Validation(format!(
                "news_limit must be between {MIN_NEWS_LIMIT} and {}, got {}",
                limits.max_news_limit, request.news_limit
            )));
        }
        Ok(())
    }

    /// Run one request through the whole workflow.
    ///
    /// Only a validation failure is returned as `Err`. Every accepted request
    /// yields a well-formed response; provider, stage, deadline, notification
    /// and assembly failures are reported in its `errors` list.
    pub async fn execute(&self, request: AnalysisRequest) -> Result<AnalysisResponse, EngineError> {
        self.validate(&request)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let limits = &self.plan.limits;
        info!(%run_id, symbols = ?request.symbols, news_limit = request.news_limit, "Run started");

        // Parallel phase
        let outcome = run_analysis_phase(&self.plan.signals, &request, limits.branch_timeout).await;
        let mut state = RunState::from_analysis(run_id, &request, outcome);

        // Sequential phase
        run_reasoning_phase(&self.plan.committee, &mut state, limits.reasoning_timeout).await;

        // Terminal phase
        if state.status() == RunStatus::Adjudicated {
            self.notify(&mut state).await;
        }

        let response = to_response(&state, started_at, start.elapsed());
        info!(
            %run_id,
            success = response.success,
            direction = response.final_decision.as_ref().map(|d| d.direction.as_str()).unwrap_or("none"),
            errors = response.errors.len(),
            elapsed_ms = response.processing_time_ms,
            "Run complete"
        );

        self.persist(&response).await;
        Ok(response)
    }

    /// Deliver the decision once. Failures, timeouts and panics are recorded on
    /// the run, never escalated.
    async fn notify(&self, state: &mut RunState) {
        let decision = match final_decision(state) {
            Ok(Some(decision)) => decision,
            // Nothing deliverable; the assembler reports why
            Ok(None) | Err(_) => return,
        };

        let notice = DecisionNotice {
            run_id: state.run_id(),
            symbols: state.symbols().to_vec(),
            decision,
        };
        let notifier = Arc::clone(&self.plan.notifier);
        let budget = self.plan.limits.notification_timeout;
        let run_id = notice.run_id;

        let task = AbortOnDropHandle::new(tokio::spawn({
            let notifier = Arc::clone(&notifier);
            async move { notifier.notify(&notice).await }
        }));
        let message = match tokio::time::timeout(budget, task).await {
            Ok(Ok(Ok(()))) => {
                info!(%run_id, notifier = notifier.name(), "Decision delivered");
                return;
            }
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(e)) => {
                error!(%run_id, notifier = notifier.name(), error = %e, "Notifier task panicked");
                format!("notifier task aborted: {e}")
            }
            Err(_) => format!("timed out after {budget:?}"),
        };

        warn!(%run_id, notifier = notifier.name(), error = %message, "Notification failed");
        state.push_error(RunError::new(
            ErrorKind::Notification,
            notifier.name(),
            message,
        ));
    }

    async fn persist(&self, response: &AnalysisResponse) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.record(response).await {
            warn!(run_id = %response.run_id, error = %e, "Failed to persist run snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubPlan;

    #[test]
    fn validation_bounds() {
        let engine = StubPlan::happy().engine();

        let ok = AnalysisRequest::single("BTCUSD");
        assert!(engine.validate(&ok).is_ok());

        let too_many = AnalysisRequest::new(
            ["BTCUSD", "ETHUSD", "SOLUSD", "XRPUSD", "ADAUSD", "DOGEUSD"]
                .map(String::from)
                .to_vec(),
            10,
        );
        assert!(matches!(
            engine.validate(&too_many),
            Err(EngineError::Validation(m)) if m.contains("at most 5")
        ));

        let blank = AnalysisRequest::new(vec!["BTCUSD".into(), "  ".into()], 10);
        assert!(engine.validate(&blank).is_err());

        for news_limit in [0, 51] {
            let request = AnalysisRequest::new(vec!["BTCUSD".into()], news_limit);
            assert!(engine.validate(&request).is_err(), "news_limit={news_limit}");
        }
        assert!(engine
            .validate(&AnalysisRequest::new(vec!["BTCUSD".into()], 50))
            .is_ok());
    }
}
