use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use superbot_models::cache_schema::RUN_SNAPSHOT_DDL;
use superbot_models::committee::Direction;
use superbot_models::response::AnalysisResponse;
use tracing::debug;
use uuid::Uuid;

use crate::error::CacheError;

/// One line of run history.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub symbols: Vec<String>,
    pub success: bool,
    pub direction: Option<Direction>,
    pub created_at: DateTime<Utc>,
}

/// Append-only store of finished runs.
///
/// Opens its own database with WAL so the CLI can list history while a
/// scheduled daemon keeps writing.
pub struct RunStore {
    conn: Mutex<Connection>,
}

impl RunStore {
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(RUN_SNAPSHOT_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(RUN_SNAPSHOT_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Unavailable(format!("run store mutex poisoned: {e}")))
    }

    /// Record a finished run. A second insert for the same run id replaces the first.
    pub fn insert(&self, response: &AnalysisResponse) -> Result<(), CacheError> {
        let response_json = serde_json::to_string(response)?;
        let direction = response
            .final_decision
            .as_ref()
            .map(|d| d.direction.as_str());

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO run_snapshots \
             (run_id, symbols, success, direction, response_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                response.run_id.to_string(),
                response.symbols.join(","),
                response.success,
                direction,
                response_json,
                response.finished_at.to_rfc3339(),
            ],
        )?;
        debug!(run_id = %response.run_id, "Run snapshot stored");
        Ok(())
    }

    /// The full response recorded for `run_id`.
    pub fn get(&self, run_id: Uuid) -> Result<Option<AnalysisResponse>, CacheError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT response_json FROM run_snapshots WHERE run_id = ?1",
            rusqlite::params![run_id.to_string()],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    /// Most recent runs first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunSummary>, CacheError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT run_id, symbols, success, direction, created_at \
             FROM run_snapshots ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(rusqlite::params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (run_id, symbols, success, direction, created_at) = row?;
            summaries.push(RunSummary {
                run_id: Uuid::parse_str(&run_id).map_err(|e| {
                    CacheError::Unavailable(format!("bad run id {run_id:?} in run store: {e}"))
                })?,
                symbols: symbols
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                success,
                direction: direction
                    .map(|d| serde_json::from_value(serde_json::Value::String(d)))
                    .transpose()?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| {
                        CacheError::Unavailable(format!("bad timestamp {created_at:?}: {e}"))
                    })?
                    .with_timezone(&Utc),
            });
        }
        Ok(summaries)
    }

    pub fn count(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM run_snapshots", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use superbot_models::committee::{ConfidenceLevel, RiskLevel};
    use superbot_models::response::{
        ErrorKind, FinalDecision, RunError, RESPONSE_SCHEMA_VERSION,
    };

    fn make_response(minutes_ago: i64, decision: Option<Direction>) -> AnalysisResponse {
        let finished_at = Utc::now() - Duration::minutes(minutes_ago);
        let final_decision = decision.map(|direction| FinalDecision {
            direction,
            entry_price: Some(dec!(96500)),
            stop_loss: Some(dec!(95000)),
            take_profit: Some(dec!(98000)),
            rationale: "Support held on rising volume.".to_string(),
            risk_assessment: RiskLevel::Medium,
            confidence_level: ConfidenceLevel::Medium,
        });
        let errors = if final_decision.is_none() {
            vec![RunError::new(ErrorKind::FatalStage, "strategist", "no output")]
        } else {
            vec![]
        };
        AnalysisResponse {
            run_id: Uuid::new_v4(),
            schema_version: RESPONSE_SCHEMA_VERSION,
            success: final_decision.is_some(),
            symbols: vec!["BTCUSD".to_string()],
            news_analysis: None,
            technical_analysis: None,
            fear_greed: None,
            support_resistance: None,
            strategist_proposal: None,
            skeptic_critique: None,
            final_decision,
            errors,
            started_at: finished_at - Duration::seconds(4),
            finished_at,
            processing_time_ms: 4_000,
        }
    }

    #[test]
    fn insert_and_get() {
        let store = RunStore::open_in_memory().unwrap();
        let response = make_response(0, Some(Direction::Buy));
        store.insert(&response).unwrap();

        let loaded = store.get(response.run_id).unwrap().unwrap();
        assert_eq!(loaded, response);
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn recent_orders_newest_first() {
        let store = RunStore::open_in_memory().unwrap();
        let old = make_response(60, None);
        let newer = make_response(5, Some(Direction::Hold));
        let newest = make_response(1, Some(Direction::Sell));
        for r in [&old, &newer, &newest] {
            store.insert(r).unwrap();
        }

        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].run_id, newest.run_id);
        assert_eq!(recent[0].direction, Some(Direction::Sell));
        assert_eq!(recent[1].run_id, newer.run_id);

        let all = store.recent(10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(!all[2].success);
        assert!(all[2].direction.is_none());
        assert_eq!(all[2].symbols, vec!["BTCUSD"]);
    }

    #[test]
    fn reinsert_replaces() {
        let store = RunStore::open_in_memory().unwrap();
        let mut response = make_response(0, Some(Direction::Buy));
        store.insert(&response).unwrap();
        response.success = false;
        store.insert(&response).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert!(!store.get(response.run_id).unwrap().unwrap().success);
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.db");
        let path = path.to_str().unwrap();

        let response = make_response(0, Some(Direction::Buy));
        {
            let store = RunStore::open(path).unwrap();
            store.insert(&response).unwrap();
        }

        let reopened = RunStore::open(path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.recent(1).unwrap()[0].run_id, response.run_id);
    }
}
