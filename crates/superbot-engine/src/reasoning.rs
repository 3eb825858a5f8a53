use std::sync::Arc;
use std::time::{Duration, Instant};

use superbot_models::committee::StageRole;
use superbot_models::response::{ErrorKind, RunError};
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info};

use crate::plan::Committee;
use crate::stage::ReasoningStage;
use crate::state::{RunState, RunStatus};

/// Run strategist, skeptic and executor in order against `state`.
///
/// A stage error stops the chain: it is recorded as `fatal_stage_error`, the run
/// is marked failed and later stages are not invoked. Exceeding `deadline`
/// records `timeout_error` and fails the run; outputs written before the
/// deadline are kept. A panicking stage counts as a stage error. Returns the
/// terminal error, if any.
pub async fn run_reasoning_phase(
    committee: &Committee,
    state: &mut RunState,
    deadline: Duration,
) -> Option<RunError> {
    let start = Instant::now();
    let run_id = state.run_id();
    info!(%run_id, missing = ?state.missing_inputs(), "Reasoning phase started");

    let outcome = tokio::time::timeout(deadline, run_stages(committee, state)).await;
    let terminal = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(fatal)) => Some(fatal),
        Err(_) => {
            let stage = state
                .next_stage()
                .map(|role| role.as_str())
                .unwrap_or("committee");
            Some(RunError::new(
                ErrorKind::Timeout,
                stage,
                format!("reasoning phase exceeded its deadline of {deadline:?}"),
            ))
        }
    };

    if let Some(err) = &terminal {
        error!(%run_id, error = %err, elapsed_ms = start.elapsed().as_millis() as u64, "Reasoning phase failed");
        state.fail(err.clone());
    } else {
        info!(%run_id, elapsed_ms = start.elapsed().as_millis() as u64, "Reasoning phase complete");
    }
    terminal
}

async fn run_stages(committee: &Committee, state: &mut RunState) -> Result<(), RunError> {
    let proposal = invoke(&committee.strategist, state).await?;
    accept(state.record_proposal(proposal), StageRole::Strategist)?;

    let critique = invoke(&committee.skeptic, state).await?;
    accept(state.record_critique(critique), StageRole::Skeptic)?;

    let decision = invoke(&committee.executor, state).await?;
    accept(state.record_decision(decision), StageRole::Executor)?;

    debug_assert_eq!(state.status(), RunStatus::Adjudicated);
    Ok(())
}

/// Run one stage on its own task against a snapshot of `state`.
///
/// The task is aborted if this future is dropped, so the phase deadline also
/// stops the stage.
async fn invoke<T: Send + 'static>(
    stage: &Arc<dyn ReasoningStage<Output = T>>,
    state: &RunState,
) -> Result<T, RunError> {
    let role = stage.role();
    let start = Instant::now();
    let stage = Arc::clone(stage);
    let snapshot = state.clone();
    let task = AbortOnDropHandle::new(tokio::spawn(async move { stage.reason(&snapshot).await }));

    match task.await {
        Ok(Ok(output)) => {
            info!(run_id = %state.run_id(), stage = %role, elapsed_ms = start.elapsed().as_millis() as u64, "Stage complete");
            Ok(output)
        }
        Ok(Err(e)) => Err(RunError::new(
            ErrorKind::FatalStage,
            role.as_str(),
            e.to_string(),
        )),
        Err(e) => {
            error!(run_id = %state.run_id(), stage = %role, error = %e, "Stage task panicked");
            Err(RunError::new(
                ErrorKind::FatalStage,
                role.as_str(),
                format!("stage task aborted: {e}"),
            ))
        }
    }
}

fn accept(recorded: bool, role: StageRole) -> Result<(), RunError> {
    if recorded {
        Ok(())
    } else {
        Err(RunError::new(
            ErrorKind::FatalStage,
            role.as_str(),
            "stage output arrived out of order",
        ))
    }
}
