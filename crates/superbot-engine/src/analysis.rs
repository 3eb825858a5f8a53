use std::sync::Arc;
use std::time::{Duration, Instant};

use superbot_models::request::AnalysisRequest;
use superbot_models::response::{ErrorKind, RunError};
use superbot_models::signals::{
    FearGreedReading, NewsAnalysis, SignalKind, SupportResistanceLevels, TechnicalAnalysis,
};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::error::AgentError;
use crate::plan::SignalProviders;
use crate::provider::SignalProvider;

/// The settled analysis phase: zero to four records and one error per failed branch.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub news: Option<NewsAnalysis>,
    pub technical: Option<TechnicalAnalysis>,
    pub fear_greed: Option<FearGreedReading>,
    pub support_resistance: Option<SupportResistanceLevels>,
    pub errors: Vec<RunError>,
}

impl AnalysisOutcome {
    /// Kinds without a record, in fixed order.
    pub fn missing(&self) -> Vec<SignalKind> {
        let present = [
            self.news.is_some(),
            self.technical.is_some(),
            self.fear_greed.is_some(),
            self.support_resistance.is_some(),
        ];
        SignalKind::ALL
            .into_iter()
            .zip(present)
            .filter_map(|(kind, present)| (!present).then_some(kind))
            .collect()
    }

    pub fn settled_count(&self) -> usize {
        SignalKind::ALL.len() - self.missing().len()
    }
}

type BranchOutput<T> = (Result<T, AgentError>, Duration);

/// Run the four signal providers concurrently and wait for all of them to settle.
///
/// Each branch gets its own `branch_timeout`; an overrun cancels only that branch.
/// A failed, timed-out or panicked branch leaves its slot empty and adds one
/// `provider_error` tagged with the branch name. Siblings are never aborted.
pub async fn run_analysis_phase(
    signals: &SignalProviders,
    request: &AnalysisRequest,
    branch_timeout: Duration,
) -> AnalysisOutcome {
    let start = Instant::now();
    let request = Arc::new(request.clone());

    // Fan out
    let news = spawn_branch(Arc::clone(&signals.news), Arc::clone(&request), branch_timeout);
    let technical = spawn_branch(
        Arc::clone(&signals.technical),
        Arc::clone(&request),
        branch_timeout,
    );
    let fear_greed = spawn_branch(
        Arc::clone(&signals.fear_greed),
        Arc::clone(&request),
        branch_timeout,
    );
    let support_resistance = spawn_branch(
        Arc::clone(&signals.support_resistance),
        Arc::clone(&request),
        branch_timeout,
    );

    // Fan in: every branch settles before the outcome exists
    let mut errors = Vec::new();
    let outcome = AnalysisOutcome {
        news: settle(SignalKind::News, news.await, &mut errors),
        technical: settle(SignalKind::Technical, technical.await, &mut errors),
        fear_greed: settle(SignalKind::FearGreed, fear_greed.await, &mut errors),
        support_resistance: settle(
            SignalKind::SupportResistance,
            support_resistance.await,
            &mut errors,
        ),
        errors,
    };

    info!(
        settled = outcome.settled_count(),
        failed = outcome.errors.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Analysis phase complete"
    );
    outcome
}

fn spawn_branch<T: Send + 'static>(
    provider: Arc<dyn SignalProvider<Output = T>>,
    request: Arc<AnalysisRequest>,
    budget: Duration,
) -> JoinHandle<BranchOutput<T>> {
    tokio::spawn(async move {
        let start = Instant::now();
        let result = match tokio::time::timeout(budget, provider.analyze(&request)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(budget)),
        };
        (result, start.elapsed())
    })
}

fn settle<T>(
    kind: SignalKind,
    joined: Result<BranchOutput<T>, JoinError>,
    errors: &mut Vec<RunError>,
) -> Option<T> {
    match joined {
        Ok((Ok(record), elapsed)) => {
            info!(branch = %kind, elapsed_ms = elapsed.as_millis() as u64, "Branch succeeded");
            Some(record)
        }
        Ok((Err(e), elapsed)) => {
            warn!(branch = %kind, error = %e, elapsed_ms = elapsed.as_millis() as u64, "Branch failed");
            errors.push(RunError::new(ErrorKind::Provider, kind.as_str(), e.to_string()));
            None
        }
        Err(e) => {
            error!(branch = %kind, error = %e, "Branch task panicked");
            errors.push(RunError::new(
                ErrorKind::Provider,
                kind.as_str(),
                format!("branch task aborted: {e}"),
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixtures, StubSignal};

    fn providers(
        technical: StubSignal<TechnicalAnalysis>,
    ) -> (SignalProviders, Arc<StubSignal<TechnicalAnalysis>>) {
        let technical = Arc::new(technical);
        let signals = SignalProviders {
            news: Arc::new(StubSignal::returning(SignalKind::News, fixtures::news())),
            technical: technical.clone(),
            fear_greed: Arc::new(StubSignal::returning(
                SignalKind::FearGreed,
                fixtures::fear_greed(),
            )),
            support_resistance: Arc::new(StubSignal::returning(
                SignalKind::SupportResistance,
                fixtures::levels(),
            )),
        };
        (signals, technical)
    }

    #[tokio::test]
    async fn all_branches_succeed() {
        let (signals, technical) =
            providers(StubSignal::returning(SignalKind::Technical, fixtures::technical()));

        let outcome = run_analysis_phase(
            &signals,
            &AnalysisRequest::single("BTCUSD"),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(outcome.settled_count(), 4);
        assert!(outcome.errors.is_empty());
        assert!(outcome.missing().is_empty());
        assert_eq!(technical.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_isolated_to_one_branch() {
        let (signals, _) = providers(StubSignal::hanging(SignalKind::Technical));

        let start = Instant::now();
        let outcome = run_analysis_phase(
            &signals,
            &AnalysisRequest::single("BTCUSD"),
            Duration::from_millis(100),
        )
        .await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(outcome.technical.is_none());
        assert!(outcome.news.is_some());
        assert!(outcome.fear_greed.is_some());
        assert!(outcome.support_resistance.is_some());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].origin, "technical");
        assert_eq!(outcome.errors[0].kind, ErrorKind::Provider);
        assert!(outcome.errors[0].message.contains("timed out"));
    }

    #[tokio::test]
    async fn panicking_branch_is_recorded() {
        let (signals, _) = providers(StubSignal::panicking(SignalKind::Technical));

        let outcome = run_analysis_phase(
            &signals,
            &AnalysisRequest::single("BTCUSD"),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(outcome.missing(), vec![SignalKind::Technical]);
        assert_eq!(outcome.errors[0].origin, "technical");
        assert!(outcome.errors[0].message.contains("aborted"));
    }
}
