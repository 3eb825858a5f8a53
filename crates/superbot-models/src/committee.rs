use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three members of the trading committee, in the order they speak.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Proposes a trade from the gathered signals.
    Strategist,
    /// Critiques the proposal.
    Skeptic,
    /// Rules on the proposal and the critique.
    Executor,
}

impl StageRole {
    pub const ORDER: [StageRole; 3] = [StageRole::Strategist, StageRole::Skeptic, StageRole::Executor];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageRole::Strategist => "strategist",
            StageRole::Skeptic => "skeptic",
            StageRole::Executor => "executor",
        }
    }

    /// The stage whose output this stage reads.
    pub fn predecessor(&self) -> Option<StageRole> {
        match self {
            StageRole::Strategist => None,
            StageRole::Skeptic => Some(StageRole::Strategist),
            StageRole::Executor => Some(StageRole::Skeptic),
        }
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
            Direction::Hold => "hold",
        }
    }

    /// Buy and sell decisions must carry entry, stop and target levels.
    pub fn requires_levels(&self) -> bool {
        !matches!(self, Direction::Hold)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CritiqueAssessment {
    Reject,
    ProceedWithCaution,
    Acceptable,
}

/// The strategist's trade proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategistProposal {
    pub direction: Direction,
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    /// e.g. `"1:2.5"`
    pub risk_reward_ratio: Option<String>,
    pub justification: String,
    #[serde(default)]
    pub key_factors: Vec<String>,
    pub confidence_level: ConfidenceLevel,
}

/// The skeptic's critique of the strategist's proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkepticCritique {
    pub overall_assessment: CritiqueAssessment,
    pub main_critique: String,
    #[serde(default)]
    pub identified_risks: Vec<String>,
    #[serde(default)]
    pub contradictions: Vec<String>,
    #[serde(default)]
    pub missing_considerations: Vec<String>,
    pub recommendation: String,
}

/// The executor's ruling after weighing proposal and critique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorDecision {
    #[serde(alias = "final_decision")]
    pub direction: Direction,
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub reasoning: String,
    #[serde(default)]
    pub strategist_points_accepted: Vec<String>,
    #[serde(default)]
    pub skeptic_points_accepted: Vec<String>,
    #[serde(default)]
    pub key_factors: Vec<String>,
    pub risk_assessment: RiskLevel,
    pub confidence_level: ConfidenceLevel,
    #[serde(default)]
    pub position_context_considered: bool,
}
