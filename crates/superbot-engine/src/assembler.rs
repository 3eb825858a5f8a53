use std::time::Duration;

use chrono::{DateTime, Utc};
use superbot_models::committee::{Direction, ExecutorDecision};
use superbot_models::response::{
    AnalysisResponse, ErrorKind, FinalDecision, RunError, RESPONSE_SCHEMA_VERSION,
};
use tracing::warn;

use crate::state::{RunState, RunStatus};

/// Project a finished run into the external response. Never fails.
///
/// A run that did not reach `Adjudicated`, or whose decision fails the level
/// checks, yields `success = false`. Projection errors become an
/// `assembly_error` entry on an otherwise complete response.
pub fn to_response(
    state: &RunState,
    started_at: DateTime<Utc>,
    elapsed: Duration,
) -> AnalysisResponse {
    let mut response = base_response(state, started_at, elapsed);

    match final_decision(state) {
        Ok(decision) => {
            response.success = state.status() == RunStatus::Adjudicated && decision.is_some();
            response.final_decision = decision;
        }
        Err(err) => {
            warn!(run_id = %state.run_id(), error = %err, "Response assembly failed");
            response.errors.push(err);
        }
    }
    response
}

/// The externally visible decision for `state`, if the executor produced one.
pub fn final_decision(state: &RunState) -> Result<Option<FinalDecision>, RunError> {
    match state.executor_decision() {
        None => Ok(None),
        Some(decision) => {
            check_levels(decision)
                .map_err(|msg| RunError::new(ErrorKind::Assembly, "executor", msg))?;
            Ok(Some(FinalDecision::from(decision)))
        }
    }
}

/// Buy needs stop < entry < target; sell needs target < entry < stop.
fn check_levels(decision: &ExecutorDecision) -> Result<(), String> {
    if !decision.direction.requires_levels() {
        return Ok(());
    }

    let (Some(entry), Some(stop), Some(target)) = (
        decision.entry_price,
        decision.stop_loss,
        decision.take_profit,
    ) else {
        return Err(format!(
            "{} decision is missing entry, stop loss or take profit",
            decision.direction
        ));
    };

    let ordered = match decision.direction {
        Direction::Buy => stop < entry && entry < target,
        Direction::Sell => target < entry && entry < stop,
        Direction::Hold => true,
    };
    if ordered {
        Ok(())
    } else {
        Err(format!(
            "{} levels out of order: entry={entry} stop_loss={stop} take_profit={target}",
            decision.direction
        ))
    }
}

fn base_response(
    state: &RunState,
    started_at: DateTime<Utc>,
    elapsed: Duration,
) -> AnalysisResponse {
    AnalysisResponse {
        run_id: state.run_id(),
        schema_version: RESPONSE_SCHEMA_VERSION,
        success: false,
        symbols: state.symbols().to_vec(),
        news_analysis: state.news_analysis().cloned(),
        technical_analysis: state.technical_analysis().cloned(),
        fear_greed: state.fear_greed().cloned(),
        support_resistance: state.support_resistance().cloned(),
        strategist_proposal: state.strategist_proposal().cloned(),
        skeptic_critique: state.skeptic_critique().cloned(),
        final_decision: None,
        errors: state.errors().to_vec(),
        started_at,
        finished_at: Utc::now(),
        processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;
    use rust_decimal_macros::dec;

    #[test]
    fn adjudicated_buy_is_success() {
        let state = fixtures::adjudicated_state();
        let response = to_response(&state, Utc::now(), Duration::from_millis(1500));

        assert!(response.success);
        assert!(response.errors.is_empty());
        assert_eq!(response.processing_time_ms, 1500);
        let decision = response.final_decision.unwrap();
        assert_eq!(decision.direction, Direction::Buy);
        assert_eq!(decision.entry_price, Some(dec!(96500.0)));
    }

    #[test]
    fn failed_run_is_not_success() {
        let mut state = fixtures::pending_state();
        state.fail(RunError::new(ErrorKind::FatalStage, "strategist", "no output"));

        let response = to_response(&state, Utc::now(), Duration::ZERO);
        assert!(!response.success);
        assert!(response.final_decision.is_none());
        assert_eq!(response.errors_of(ErrorKind::FatalStage).count(), 1);
        assert!(response.news_analysis.is_some());
    }

    #[test]
    fn misordered_buy_levels_become_assembly_error() {
        let mut decision = fixtures::buy_decision();
        decision.stop_loss = Some(dec!(97000));
        let state = fixtures::adjudicated_state_with(decision);

        let response = to_response(&state, Utc::now(), Duration::ZERO);
        assert!(!response.success);
        assert!(response.final_decision.is_none());
        assert!(response.technical_analysis.is_some());
        let err = response.errors_of(ErrorKind::Assembly).next().unwrap();
        assert!(err.message.contains("out of order"));
    }

    #[test]
    fn sell_without_levels_is_rejected_hold_is_not() {
        let mut sell = fixtures::buy_decision();
        sell.direction = Direction::Sell;
        sell.take_profit = None;
        assert!(check_levels(&sell).unwrap_err().contains("missing"));

        sell.entry_price = Some(dec!(96000));
        sell.stop_loss = Some(dec!(97500));
        sell.take_profit = Some(dec!(94000));
        assert!(check_levels(&sell).is_ok());

        let mut hold = fixtures::buy_decision();
        hold.direction = Direction::Hold;
        hold.entry_price = None;
        hold.stop_loss = None;
        hold.take_profit = None;
        let response = to_response(
            &fixtures::adjudicated_state_with(hold),
            Utc::now(),
            Duration::ZERO,
        );
        assert!(response.success);
        assert_eq!(response.final_decision.unwrap().direction, Direction::Hold);
    }
}
