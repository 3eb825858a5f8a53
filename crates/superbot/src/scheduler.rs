//! Unattended runs at fixed local wall-clock times.

use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Utc};
use superbot_engine::{Engine, EngineError};
use superbot_models::config::ScheduleConfig;
use superbot_models::request::AnalysisRequest;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid schedule time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("schedule has no run times")]
    Empty,

    #[error("utc offset of {0} minutes is out of range")]
    InvalidOffset(i32),

    #[error("scheduled request rejected: {0}")]
    Request(#[from] EngineError),
}

/// Parse `HH:MM` entries into sorted, de-duplicated times.
pub fn parse_times(times: &[String]) -> Result<Vec<NaiveTime>, ScheduleError> {
    let mut parsed = times
        .iter()
        .map(|t| {
            NaiveTime::parse_from_str(t.trim(), "%H:%M")
                .map_err(|_| ScheduleError::InvalidTime(t.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if parsed.is_empty() {
        return Err(ScheduleError::Empty);
    }
    parsed.sort_unstable();
    parsed.dedup();
    Ok(parsed)
}

/// The first configured time strictly after `now`, in the given fixed offset.
///
/// `times` must be sorted. Returns `None` when `times` is empty or the offset is invalid.
pub fn next_run_after(
    now: DateTime<Utc>,
    times: &[NaiveTime],
    utc_offset_minutes: i32,
) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    let local_now = now.with_timezone(&offset);

    // Today's remaining slots, else the first slot tomorrow
    [0, 1].into_iter().find_map(|days| {
        let date = local_now.date_naive().checked_add_days(Days::new(days))?;
        times.iter().find_map(|time| {
            let slot = date.and_time(*time).and_local_timezone(offset).single()?;
            (slot > local_now).then(|| slot.with_timezone(&Utc))
        })
    })
}

/// Run the configured request at every scheduled time until `cancel` fires.
///
/// A run in progress when `cancel` fires is allowed to finish.
pub async fn run_schedule(
    engine: &Engine,
    schedule: &ScheduleConfig,
    cancel: CancellationToken,
) -> Result<(), ScheduleError> {
    let times = parse_times(&schedule.times)?;
    let offset = schedule.utc_offset_minutes;
    if FixedOffset::east_opt(offset.saturating_mul(60)).is_none() {
        return Err(ScheduleError::InvalidOffset(offset));
    }

    let request = AnalysisRequest::new(schedule.symbols.clone(), schedule.news_limit);
    engine.validate(&request)?;

    info!(
        symbols = ?request.symbols,
        times = ?schedule.times,
        utc_offset_minutes = offset,
        "Scheduler started"
    );

    loop {
        let now = Utc::now();
        let Some(next) = next_run_after(now, &times, offset) else {
            return Err(ScheduleError::Empty);
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %next, wait_seconds = wait.as_secs(), "Waiting for next scheduled run");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Scheduler shutting down");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {
                run_scheduled(engine, &request).await;
            }
        }
    }
}

async fn run_scheduled(engine: &Engine, request: &AnalysisRequest) {
    match engine.execute(request.clone()).await {
        Ok(response) => info!(
            run_id = %response.run_id,
            success = response.success,
            direction = response.final_decision.as_ref().map(|d| d.direction.as_str()).unwrap_or("none"),
            errors = response.errors.len(),
            "Scheduled run finished"
        ),
        Err(e) => warn!(error = %e, "Scheduled run rejected"),
    }
}
