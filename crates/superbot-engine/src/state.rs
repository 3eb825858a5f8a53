use std::fmt;

use serde::Serialize;
use superbot_models::committee::{ExecutorDecision, SkepticCritique, StageRole, StrategistProposal};
use superbot_models::request::AnalysisRequest;
use superbot_models::response::RunError;
use superbot_models::signals::{
    FearGreedReading, NewsAnalysis, SignalKind, SupportResistanceLevels, TechnicalAnalysis,
};
use uuid::Uuid;

use crate::analysis::AnalysisOutcome;

/// Where a run is in the reasoning phase.
///
/// `Pending -> Proposed -> Critiqued -> Adjudicated`, or `Failed` from any
/// non-terminal status.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Proposed,
    Critiqued,
    Adjudicated,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Adjudicated | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Proposed => "proposed",
            RunStatus::Critiqued => "critiqued",
            RunStatus::Adjudicated => "adjudicated",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The record threaded through one run.
///
/// A `RunState` only exists once the analysis phase has settled: it is built
/// from an [`AnalysisOutcome`], so every analysis slot is final before a stage
/// can read it. Stage outputs are written through the crate-private `record_*`
/// methods, each of which only applies in the matching status. Serializing a
/// state yields the stage input document.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    #[serde(skip)]
    run_id: Uuid,
    symbols: Vec<String>,
    news_limit: u32,
    #[serde(skip)]
    status: RunStatus,
    news_analysis: Option<NewsAnalysis>,
    technical_analysis: Option<TechnicalAnalysis>,
    fear_greed: Option<FearGreedReading>,
    support_resistance: Option<SupportResistanceLevels>,
    missing_inputs: Vec<SignalKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategist_proposal: Option<StrategistProposal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skeptic_critique: Option<SkepticCritique>,
    #[serde(skip_serializing_if = "Option::is_none")]
    executor_decision: Option<ExecutorDecision>,
    #[serde(skip)]
    errors: Vec<RunError>,
}

impl RunState {
    /// Close the join barrier: take the settled analysis phase and open the run for reasoning.
    pub fn from_analysis(run_id: Uuid, request: &AnalysisRequest, outcome: AnalysisOutcome) -> Self {
        let missing_inputs = outcome.missing();
        Self {
            run_id,
            symbols: request.symbols.clone(),
            news_limit: request.news_limit,
            status: RunStatus::Pending,
            news_analysis: outcome.news,
            technical_analysis: outcome.technical,
            fear_greed: outcome.fear_greed,
            support_resistance: outcome.support_resistance,
            missing_inputs,
            strategist_proposal: None,
            skeptic_critique: None,
            executor_decision: None,
            errors: outcome.errors,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn news_limit(&self) -> u32 {
        self.news_limit
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn news_analysis(&self) -> Option<&NewsAnalysis> {
        self.news_analysis.as_ref()
    }

    pub fn technical_analysis(&self) -> Option<&TechnicalAnalysis> {
        self.technical_analysis.as_ref()
    }

    pub fn fear_greed(&self) -> Option<&FearGreedReading> {
        self.fear_greed.as_ref()
    }

    pub fn support_resistance(&self) -> Option<&SupportResistanceLevels> {
        self.support_resistance.as_ref()
    }

    /// Analyses that were not gathered for this run.
    pub fn missing_inputs(&self) -> &[SignalKind] {
        &self.missing_inputs
    }

    pub fn strategist_proposal(&self) -> Option<&StrategistProposal> {
        self.strategist_proposal.as_ref()
    }

    pub fn skeptic_critique(&self) -> Option<&SkepticCritique> {
        self.skeptic_critique.as_ref()
    }

    pub fn executor_decision(&self) -> Option<&ExecutorDecision> {
        self.executor_decision.as_ref()
    }

    pub fn errors(&self) -> &[RunError] {
        &self.errors
    }

    /// Whether `role` has written its output.
    pub fn has_output(&self, role: StageRole) -> bool {
        match role {
            StageRole::Strategist => self.strategist_proposal.is_some(),
            StageRole::Skeptic => self.skeptic_critique.is_some(),
            StageRole::Executor => self.executor_decision.is_some(),
        }
    }

    /// The stage allowed to write next, if any.
    pub fn next_stage(&self) -> Option<StageRole> {
        match self.status {
            RunStatus::Pending => Some(StageRole::Strategist),
            RunStatus::Proposed => Some(StageRole::Skeptic),
            RunStatus::Critiqued => Some(StageRole::Executor),
            RunStatus::Adjudicated | RunStatus::Failed => None,
        }
    }

    pub(crate) fn record_proposal(&mut self, proposal: StrategistProposal) -> bool {
        if self.status != RunStatus::Pending {
            return false;
        }
        self.strategist_proposal = Some(proposal);
        self.status = RunStatus::Proposed;
        true
    }

    pub(crate) fn record_critique(&mut self, critique: SkepticCritique) -> bool {
        if self.status != RunStatus::Proposed {
            return false;
        }
        self.skeptic_critique = Some(critique);
        self.status = RunStatus::Critiqued;
        true
    }

    pub(crate) fn record_decision(&mut self, decision: ExecutorDecision) -> bool {
        if self.status != RunStatus::Critiqued {
            return false;
        }
        self.executor_decision = Some(decision);
        self.status = RunStatus::Adjudicated;
        true
    }

    /// Terminate the reasoning phase. Outputs already written stay in place.
    pub(crate) fn fail(&mut self, error: RunError) {
        if self.status != RunStatus::Adjudicated {
            self.status = RunStatus::Failed;
        }
        self.errors.push(error);
    }

    pub(crate) fn push_error(&mut self, error: RunError) {
        self.errors.push(error);
    }
}
