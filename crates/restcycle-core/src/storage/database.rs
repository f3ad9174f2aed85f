//! SQLite-based session storage and statistics.
//!
//! Every completed focus phase becomes one row. Aggregation windows
//! (today, this week, all time) are computed in SQL over the RFC 3339
//! `completed_at` column, which sorts lexicographically.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread::JoinHandle;

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub completed_at: DateTime<Utc>,
    pub duration_min: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_focus_min: u64,
    pub week_sessions: u64,
    pub today_sessions: u64,
    pub today_focus_min: u64,
}

/// SQLite database for completed focus sessions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/restcycle/restcycle.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Ok(Self::open_path(&data_dir()?.join("restcycle.db"))?)
    }

    /// Open the database at an explicit path.
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                completed_at TEXT NOT NULL,
                duration_min INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Record a completed focus session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        completed_at: DateTime<Utc>,
        duration_min: u64,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sessions (completed_at, duration_min) VALUES (?1, ?2)",
            params![completed_at.to_rfc3339(), duration_min],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// The most recent sessions, newest first.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, completed_at, duration_min
             FROM sessions
             ORDER BY completed_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let raw: String = row.get(1)?;
            let completed_at = DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
            Ok(SessionRecord {
                id: row.get(0)?,
                completed_at,
                duration_min: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    /// Aggregate counts over all time, the current ISO week, and today.
    pub fn stats(&self) -> Result<Stats, rusqlite::Error> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let today_start = format!("{today}T00:00:00+00:00");
        let monday = Utc::now().date_naive()
            - chrono::Duration::days(i64::from(Utc::now().weekday().num_days_from_monday()));
        let week_start = format!("{monday}T00:00:00+00:00");

        let mut stats = Stats::default();
        let (total, total_min) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_min), 0) FROM sessions",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.total_sessions = total;
        stats.total_focus_min = total_min;

        stats.week_sessions = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE completed_at >= ?1",
            params![week_start],
            |row| row.get::<_, u64>(0),
        )?;

        let (today_count, today_min) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM sessions
             WHERE completed_at >= ?1",
            params![today_start],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_sessions = today_count;
        stats.today_focus_min = today_min;

        Ok(stats)
    }
}

/// Sink for completed focus sessions.
///
/// `append` must never block the calling state machine and must never
/// fail it; implementations log and drop on error.
pub trait SessionStore: Send + Sync {
    fn append(&self, completed_at: DateTime<Utc>, duration_min: u64);
}

/// Forwards records to a dedicated writer thread that owns the SQLite
/// connection. Dropping the store drains pending records, then joins the
/// writer.
pub struct SqliteSessionStore {
    tx: Option<mpsc::Sender<(DateTime<Utc>, u64)>>,
    writer: Option<JoinHandle<()>>,
}

impl SqliteSessionStore {
    pub fn spawn(db: Database) -> Self {
        let (tx, rx) = mpsc::channel::<(DateTime<Utc>, u64)>();
        let writer = std::thread::spawn(move || {
            for (completed_at, duration_min) in rx {
                if let Err(e) = db.record_session(completed_at, duration_min) {
                    tracing::warn!(error = %e, "failed to record completed session");
                }
            }
        });
        Self {
            tx: Some(tx),
            writer: Some(writer),
        }
    }
}

impl SessionStore for SqliteSessionStore {
    fn append(&self, completed_at: DateTime<Utc>, duration_min: u64) {
        let Some(tx) = &self.tx else { return };
        if tx.send((completed_at, duration_min)).is_err() {
            tracing::warn!("session writer is gone, dropping record");
        }
    }
}

impl Drop for SqliteSessionStore {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

/// In-memory store for tests and headless runs.
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<Vec<(DateTime<Utc>, u64)>>,
}

impl MemorySessionStore {
    pub fn records(&self) -> Vec<(DateTime<Utc>, u64)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn append(&self, completed_at: DateTime<Utc>, duration_min: u64) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((completed_at, duration_min));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        db.record_session(Utc::now(), 25).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_focus_min, 25);
        assert_eq!(stats.today_sessions, 1);
        assert_eq!(stats.today_focus_min, 25);
    }

    #[test]
    fn stats_windows_split_old_sessions() {
        let db = Database::open_memory().unwrap();
        db.record_session(Utc::now(), 25).unwrap();
        db.record_session(Utc::now() - chrono::Duration::days(8), 50).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_focus_min, 75);
        assert_eq!(stats.week_sessions, 1);
        assert_eq!(stats.today_sessions, 1);
    }

    #[test]
    fn recent_sessions_newest_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.record_session(now - chrono::Duration::hours(2), 25).unwrap();
        db.record_session(now, 30).unwrap();

        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].duration_min, 30);
        assert_eq!(recent[1].duration_min, 25);
    }

    #[test]
    fn writer_thread_flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restcycle.db");

        let store = SqliteSessionStore::spawn(Database::open_path(&path).unwrap());
        store.append(Utc::now(), 25);
        store.append(Utc::now(), 25);
        drop(store);

        let db = Database::open_path(&path).unwrap();
        assert_eq!(db.stats().unwrap().total_sessions, 2);
    }

    #[test]
    fn memory_store_collects_records() {
        let store = MemorySessionStore::default();
        store.append(Utc::now(), 25);
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].1, 25);
    }
}
