//! Test support: stub providers, stages, notifiers and sinks with call
//! counters, plus canned BTCUSD fixtures.
//!
//! The stubs never touch the network or the Claude CLI. Stub stages assert
//! that their predecessor has written its output before they run, so any
//! ordering bug in the stage runner fails the run that triggers it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use superbot_models::committee::{
    ExecutorDecision, SkepticCritique, StageRole, StrategistProposal,
};
use superbot_models::request::AnalysisRequest;
use superbot_models::response::AnalysisResponse;
use superbot_models::signals::{
    FearGreedReading, NewsAnalysis, SignalKind, SupportResistanceLevels, TechnicalAnalysis,
};

use crate::controller::Engine;
use crate::error::AgentError;
use crate::notifier::{DecisionNotice, Notifier};
use crate::plan::{Committee, ExecutionPlan, PlanLimits, SignalProviders};
use crate::provider::SignalProvider;
use crate::sink::RunSink;
use crate::stage::ReasoningStage;
use crate::state::RunState;

/// What a stub does when called.
#[derive(Debug, Clone)]
pub enum Behavior<T> {
    Return(T),
    Fail(String),
    /// Never completes; only a timeout ends the call.
    Hang,
    Panic,
}

impl<T: Clone> Behavior<T> {
    async fn run(&self, who: &str) -> Result<T, AgentError> {
        match self {
            Behavior::Return(value) => Ok(value.clone()),
            Behavior::Fail(message) => Err(AgentError::MissingData(message.clone())),
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("stub {who} panicked"),
        }
    }
}

/// A signal provider with a fixed behavior.
pub struct StubSignal<T> {
    kind: SignalKind,
    behavior: Behavior<T>,
    calls: AtomicUsize,
}

impl<T> StubSignal<T> {
    pub fn new(kind: SignalKind, behavior: Behavior<T>) -> Self {
        Self {
            kind,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(kind: SignalKind, value: T) -> Self {
        Self::new(kind, Behavior::Return(value))
    }

    pub fn failing(kind: SignalKind, message: &str) -> Self {
        Self::new(kind, Behavior::Fail(message.to_string()))
    }

    pub fn hanging(kind: SignalKind) -> Self {
        Self::new(kind, Behavior::Hang)
    }

    pub fn panicking(kind: SignalKind) -> Self {
        Self::new(kind, Behavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T> SignalProvider for StubSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<T, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.run(self.kind.as_str()).await
    }
}

/// A committee stage with a fixed behavior.
///
/// Panics if invoked before its predecessor has written its output, or out of turn.
pub struct StubStage<T> {
    role: StageRole,
    behavior: Behavior<T>,
    calls: AtomicUsize,
    seen_missing: Mutex<Option<Vec<SignalKind>>>,
}

impl<T> StubStage<T> {
    pub fn new(role: StageRole, behavior: Behavior<T>) -> Self {
        Self {
            role,
            behavior,
            calls: AtomicUsize::new(0),
            seen_missing: Mutex::new(None),
        }
    }

    pub fn returning(role: StageRole, value: T) -> Self {
        Self::new(role, Behavior::Return(value))
    }

    pub fn failing(role: StageRole, message: &str) -> Self {
        Self::new(role, Behavior::Fail(message.to_string()))
    }

    pub fn hanging(role: StageRole) -> Self {
        Self::new(role, Behavior::Hang)
    }

    pub fn panicking(role: StageRole) -> Self {
        Self::new(role, Behavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `missing_inputs` of the state this stage last received.
    pub fn seen_missing(&self) -> Option<Vec<SignalKind>> {
        self.seen_missing.lock().ok().and_then(|seen| seen.clone())
    }
}

#[async_trait]
impl<T> ReasoningStage for StubStage<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn role(&self) -> StageRole {
        self.role
    }

    async fn reason(&self, state: &RunState) -> Result<T, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(predecessor) = self.role.predecessor() {
            assert!(
                state.has_output(predecessor),
                "{} invoked before {predecessor} wrote its output",
                self.role
            );
        }
        assert_eq!(state.next_stage(), Some(self.role), "{} invoked out of turn", self.role);

        if let Ok(mut seen) = self.seen_missing.lock() {
            *seen = Some(state.missing_inputs().to_vec());
        }
        self.behavior.run(self.role.as_str()).await
    }
}

/// Records every notice it is asked to deliver.
pub struct RecordingNotifier {
    behavior: Behavior<()>,
    notices: Mutex<Vec<DecisionNotice>>,
}

impl RecordingNotifier {
    pub fn new(behavior: Behavior<()>) -> Self {
        Self {
            behavior,
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::new(Behavior::Return(()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(Behavior::Fail(message.to_string()))
    }

    pub fn hanging() -> Self {
        Self::new(Behavior::Hang)
    }

    pub fn panicking() -> Self {
        Self::new(Behavior::Panic)
    }

    /// Every notice received, delivered or not.
    pub fn notices(&self) -> Vec<DecisionNotice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.notices().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notice: &DecisionNotice) -> Result<(), AgentError> {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
        self.behavior.run("notifier").await
    }
}

/// Keeps responses in memory, or refuses them.
#[derive(Default)]
pub struct RecordingSink {
    fail: bool,
    responses: Mutex<Vec<AnalysisResponse>>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            responses: Mutex::new(Vec::new()),
        }
    }

    pub fn responses(&self) -> Vec<AnalysisResponse> {
        self.responses
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RunSink for RecordingSink {
    async fn record(&self, response: &AnalysisResponse) -> Result<(), AgentError> {
        if self.fail {
            return Err(AgentError::MissingData("sink unavailable".to_string()));
        }
        if let Ok(mut responses) = self.responses.lock() {
            responses.push(response.clone());
        }
        Ok(())
    }
}

/// Short timeouts so hanging stubs resolve quickly.
pub fn test_limits() -> PlanLimits {
    PlanLimits {
        branch_timeout: Duration::from_millis(200),
        reasoning_timeout: Duration::from_secs(2),
        notification_timeout: Duration::from_millis(200),
        ..PlanLimits::default()
    }
}

/// An execution plan made of stubs, with handles kept for assertions.
///
/// Replace any field before calling [`build`](Self::build) or [`engine`](Self::engine).
pub struct StubPlan {
    pub news: Arc<StubSignal<NewsAnalysis>>,
    pub technical: Arc<StubSignal<TechnicalAnalysis>>,
    pub fear_greed: Arc<StubSignal<FearGreedReading>>,
    pub support_resistance: Arc<StubSignal<SupportResistanceLevels>>,
    pub strategist: Arc<StubStage<StrategistProposal>>,
    pub skeptic: Arc<StubStage<SkepticCritique>>,
    pub executor: Arc<StubStage<ExecutorDecision>>,
    pub notifier: Arc<RecordingNotifier>,
    pub limits: PlanLimits,
}

impl StubPlan {
    /// Every provider and stage returns its canned BTCUSD fixture; the run ends in BUY.
    pub fn happy() -> Self {
        Self {
            news: Arc::new(StubSignal::returning(SignalKind::News, fixtures::news())),
            technical: Arc::new(StubSignal::returning(
                SignalKind::Technical,
                fixtures::technical(),
            )),
            fear_greed: Arc::new(StubSignal::returning(
                SignalKind::FearGreed,
                fixtures::fear_greed(),
            )),
            support_resistance: Arc::new(StubSignal::returning(
                SignalKind::SupportResistance,
                fixtures::levels(),
            )),
            strategist: Arc::new(StubStage::returning(
                StageRole::Strategist,
                fixtures::buy_proposal(),
            )),
            skeptic: Arc::new(StubStage::returning(StageRole::Skeptic, fixtures::critique())),
            executor: Arc::new(StubStage::returning(
                StageRole::Executor,
                fixtures::buy_decision(),
            )),
            notifier: Arc::new(RecordingNotifier::ok()),
            limits: test_limits(),
        }
    }

    pub fn build(&self) -> ExecutionPlan {
        ExecutionPlan {
            signals: SignalProviders {
                news: self.news.clone(),
                technical: self.technical.clone(),
                fear_greed: self.fear_greed.clone(),
                support_resistance: self.support_resistance.clone(),
            },
            committee: Committee {
                strategist: self.strategist.clone(),
                skeptic: self.skeptic.clone(),
                executor: self.executor.clone(),
            },
            notifier: self.notifier.clone(),
            limits: self.limits.clone(),
        }
    }

    pub fn engine(&self) -> Engine {
        Engine::new(Arc::new(self.build()))
    }

    /// Total calls across the four signal providers.
    pub fn signal_calls(&self) -> usize {
        self.news.calls()
            + self.technical.calls()
            + self.fear_greed.calls()
            + self.support_resistance.calls()
    }

    /// Total calls across the three stages.
    pub fn stage_calls(&self) -> usize {
        self.strategist.calls() + self.skeptic.calls() + self.executor.calls()
    }
}

/// Canned BTCUSD records.
pub mod fixtures {
    use rust_decimal::Decimal;
    use superbot_models::committee::{
        ConfidenceLevel, CritiqueAssessment, Direction, ExecutorDecision, RiskLevel,
        SkepticCritique, StrategistProposal,
    };
    use superbot_models::request::AnalysisRequest;
    use superbot_models::signals::{
        CrossoverStatus, FearGreedReading, Momentum, NewsAnalysis, NewsSentiment,
        SupportResistanceLevels, TechnicalAnalysis,
    };
    use uuid::Uuid;

    use crate::analysis::AnalysisOutcome;
    use crate::state::RunState;

    pub const ENTRY: Decimal = Decimal::from_parts(96500, 0, 0, false, 0);
    pub const STOP: Decimal = Decimal::from_parts(95000, 0, 0, false, 0);
    pub const TARGET: Decimal = Decimal::from_parts(98000, 0, 0, false, 0);

    pub fn news() -> NewsAnalysis {
        NewsAnalysis {
            sentiment: NewsSentiment::Positive,
            context_summary: "Spot ETF inflows extended for a fifth consecutive day.".to_string(),
            market_opinion: "Analysts expect a retest of the 98k resistance.".to_string(),
            headlines: vec![
                "Spot ETF inflows extend streak to five days".to_string(),
                "Bitcoin reclaims 96k as shorts unwind".to_string(),
            ],
        }
    }

    pub fn technical() -> TechnicalAnalysis {
        TechnicalAnalysis {
            trend_analysis: "SMA25 crossed above SMA200 three sessions ago.".to_string(),
            crossover_status: CrossoverStatus::GoldenCross,
            momentum: Momentum::Bullish,
            conclusion: "Uptrend confirmed on rising volume.".to_string(),
        }
    }

    pub fn fear_greed() -> FearGreedReading {
        FearGreedReading {
            index: 74,
            classification: "Greed".to_string(),
        }
    }

    pub fn levels() -> SupportResistanceLevels {
        SupportResistanceLevels {
            current_price: ENTRY,
            nearest_support: Some(STOP),
            distance_to_support: Some("-1.55%".to_string()),
            nearest_resistance: Some(TARGET),
            distance_to_resistance: Some("1.55%".to_string()),
        }
    }

    pub fn full_outcome() -> AnalysisOutcome {
        AnalysisOutcome {
            news: Some(news()),
            technical: Some(technical()),
            fear_greed: Some(fear_greed()),
            support_resistance: Some(levels()),
            errors: Vec::new(),
        }
    }

    pub fn buy_proposal() -> StrategistProposal {
        StrategistProposal {
            direction: Direction::Buy,
            entry_price: Some(ENTRY),
            stop_loss: Some(STOP),
            take_profit: Some(TARGET),
            risk_reward_ratio: Some("1:1.0".to_string()),
            justification: "Golden cross with positive news while price holds above support."
                .to_string(),
            key_factors: vec![
                "golden cross".to_string(),
                "support at 95000".to_string(),
                "ETF inflows".to_string(),
            ],
            confidence_level: ConfidenceLevel::Medium,
        }
    }

    pub fn critique() -> SkepticCritique {
        SkepticCritique {
            overall_assessment: CritiqueAssessment::ProceedWithCaution,
            main_critique: "Greed reading leaves little room for upside surprise.".to_string(),
            identified_risks: vec!["resistance at 98000 rejected twice this month".to_string()],
            contradictions: Vec::new(),
            missing_considerations: vec!["weekend liquidity".to_string()],
            recommendation: "Proceed with the stop below support.".to_string(),
        }
    }

    pub fn buy_decision() -> ExecutorDecision {
        ExecutorDecision {
            direction: Direction::Buy,
            entry_price: Some(ENTRY),
            stop_loss: Some(STOP),
            take_profit: Some(TARGET),
            reasoning: "Trend and news align; the skeptic's resistance risk is covered by the \
                        target sitting at resistance."
                .to_string(),
            strategist_points_accepted: vec!["golden cross".to_string()],
            skeptic_points_accepted: vec!["resistance at 98000".to_string()],
            key_factors: vec!["support at 95000".to_string()],
            risk_assessment: RiskLevel::Medium,
            confidence_level: ConfidenceLevel::Medium,
            position_context_considered: false,
        }
    }

    /// A fully analyzed BTCUSD run waiting for the strategist.
    pub fn pending_state() -> RunState {
        RunState::from_analysis(
            Uuid::new_v4(),
            &AnalysisRequest::single("BTCUSD"),
            full_outcome(),
        )
    }

    pub fn adjudicated_state() -> RunState {
        adjudicated_state_with(buy_decision())
    }

    pub fn adjudicated_state_with(decision: ExecutorDecision) -> RunState {
        let mut state = pending_state();
        state.record_proposal(buy_proposal());
        state.record_critique(critique());
        state.record_decision(decision);
        state
    }
}
