use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::committee::{
    ConfidenceLevel, Direction, ExecutorDecision, RiskLevel, SkepticCritique, StrategistProposal,
};
use crate::signals::{FearGreedReading, NewsAnalysis, SupportResistanceLevels, TechnicalAnalysis};

pub const RESPONSE_SCHEMA_VERSION: u32 = 1;

/// Classification of an error entry in a run's error list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, rejected before any provider runs.
    #[serde(rename = "validation_error")]
    Validation,
    /// A single analysis provider failed or timed out.
    #[serde(rename = "provider_error")]
    Provider,
    /// A reasoning stage produced no output; later stages were skipped.
    #[serde(rename = "fatal_stage_error")]
    FatalStage,
    /// The reasoning phase exceeded its overall deadline.
    #[serde(rename = "timeout_error")]
    Timeout,
    /// Delivering the decision failed. Never affects `success`.
    #[serde(rename = "notification_error")]
    Notification,
    /// Projecting the run into a response failed.
    #[serde(rename = "assembly_error")]
    Assembly,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Provider => "provider_error",
            ErrorKind::FatalStage => "fatal_stage_error",
            ErrorKind::Timeout => "timeout_error",
            ErrorKind::Notification => "notification_error",
            ErrorKind::Assembly => "assembly_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a run's append-only error list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunError {
    pub kind: ErrorKind,
    /// Which branch or stage produced the error (e.g. `"technical"`, `"skeptic"`).
    pub origin: String,
    pub message: String,
}

impl RunError {
    pub fn new(kind: ErrorKind, origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.origin, self.message)
    }
}

/// The externally visible final decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalDecision {
    pub direction: Direction,
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub rationale: String,
    pub risk_assessment: RiskLevel,
    pub confidence_level: ConfidenceLevel,
}

impl From<&ExecutorDecision> for FinalDecision {
    fn from(decision: &ExecutorDecision) -> Self {
        Self {
            direction: decision.direction,
            entry_price: decision.entry_price,
            stop_loss: decision.stop_loss,
            take_profit: decision.take_profit,
            rationale: decision.reasoning.clone(),
            risk_assessment: decision.risk_assessment,
            confidence_level: decision.confidence_level,
        }
    }
}

/// The response returned for every accepted analysis request.
///
/// `success == false` plus a populated `errors` list is the only failure signal;
/// business-level failures never surface as a bare fault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub run_id: Uuid,
    pub schema_version: u32,
    pub success: bool,
    pub symbols: Vec<String>,
    pub news_analysis: Option<NewsAnalysis>,
    pub technical_analysis: Option<TechnicalAnalysis>,
    pub fear_greed: Option<FearGreedReading>,
    pub support_resistance: Option<SupportResistanceLevels>,
    pub strategist_proposal: Option<StrategistProposal>,
    pub skeptic_critique: Option<SkepticCritique>,
    pub final_decision: Option<FinalDecision>,
    pub errors: Vec<RunError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processing_time_ms: u64,
}

impl AnalysisResponse {
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &RunError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_kind_tags() {
        let kinds = [
            ErrorKind::Validation,
            ErrorKind::Provider,
            ErrorKind::FatalStage,
            ErrorKind::Timeout,
            ErrorKind::Notification,
            ErrorKind::Assembly,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn run_error_display() {
        let err = RunError::new(ErrorKind::Provider, "technical", "timed out after 20s");
        assert_eq!(err.to_string(), "[provider_error] technical: timed out after 20s");
    }

    #[test]
    fn final_decision_from_executor() {
        let decision = ExecutorDecision {
            direction: Direction::Sell,
            entry_price: Some(dec!(96000)),
            stop_loss: Some(dec!(97500)),
            take_profit: Some(dec!(94000)),
            reasoning: "Resistance rejected twice with extreme greed.".to_string(),
            strategist_points_accepted: vec![],
            skeptic_points_accepted: vec![],
            key_factors: vec![],
            risk_assessment: RiskLevel::High,
            confidence_level: ConfidenceLevel::Low,
            position_context_considered: true,
        };
        let final_decision = FinalDecision::from(&decision);
        assert_eq!(final_decision.direction, Direction::Sell);
        assert_eq!(final_decision.take_profit, Some(dec!(94000)));
        assert_eq!(final_decision.rationale, decision.reasoning);
    }
}
