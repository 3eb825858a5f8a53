use chrono::{Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use superbot_models::cache_schema::{key_patterns, CacheCategory, CacheRow, CACHE_TABLE_DDL};
use superbot_models::signals::{NewsHeadline, SignalKind};

use crate::error::CacheError;

/// SQLite accessor for the shared signal cache.
///
/// Signal pipelines write the database; superbot opens it read-only.
pub struct SqliteReader {
    conn: Connection,
}

impl SqliteReader {
    /// Open a read-only connection to the shared cache database.
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open a writable database and create the schema. Used by pipelines and tests.
    pub fn open_writable(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(CACHE_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// In-memory database with the schema in place. Writable so tests can seed data.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CACHE_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Get a single cache entry by key. Returns None if not found or expired.
    pub fn get(&self, key: &str) -> Result<Option<CacheRow>, CacheError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(
            "SELECT key, category, value_json, source, symbol, created_at, expires_at, updated_at \
             FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
        )?;

        let result = stmt.query_row(rusqlite::params![key, now], |row| {
            Ok(CacheRow {
                key: row.get(0)?,
                category: row.get(1)?,
                value_json: row.get(2)?,
                source: row.get(3)?,
                symbol: row.get(4)?,
                created_at: row.get(5)?,
                expires_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        });

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    pub fn insert(&self, row: &CacheRow) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cache_entries \
             (key, category, value_json, source, symbol, created_at, expires_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                row.key,
                row.category,
                row.value_json,
                row.source,
                row.symbol,
                row.created_at,
                row.expires_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Write a typed signal record under its conventional key.
    pub fn put_signal<T: Serialize>(
        &self,
        kind: SignalKind,
        symbol: &str,
        value: &T,
        source: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let scope = (!kind.is_market_wide()).then_some(symbol);
        self.put_json(
            &key_patterns::for_kind(kind, symbol),
            CacheCategory::from(kind),
            scope,
            value,
            source,
            ttl,
        )
    }

    /// Write the raw news items for `symbol`, as the news pipeline does.
    pub fn put_headlines(
        &self,
        symbol: &str,
        headlines: &[NewsHeadline],
        source: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put_json(
            &key_patterns::headlines(symbol),
            CacheCategory::News,
            Some(symbol),
            &headlines,
            source,
            ttl,
        )
    }

    fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        category: CacheCategory,
        symbol: Option<&str>,
        value: &T,
        source: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let now = Utc::now();
        let category = serde_json::to_value(&category)?;
        let row = CacheRow {
            key: key.to_string(),
            category: category.as_str().unwrap_or_default().to_string(),
            value_json: serde_json::to_string(value)?,
            source: source.to_string(),
            symbol: symbol.map(str::to_string),
            created_at: now.to_rfc3339(),
            expires_at: (now + ttl).to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        self.insert(&row)
    }
}
