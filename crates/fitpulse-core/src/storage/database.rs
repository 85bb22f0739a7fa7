//! SQLite-backed durable storage.
//!
//! Two concerns live here:
//! - a `kv` table holding the active-session snapshot and the heart-rate
//!   sample buffer under fixed keys (kept separate so the primary record
//!   stays small), and
//! - a `history` table of finished sessions feeding the stats queries.
//!
//! The connection sits behind an `Arc<Mutex<_>>` so the handle is cheap to
//! clone into the session engine and the CLI.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{EngineError, StorageError};
use crate::metrics::HeartRateBuffer;
use crate::session::{SessionState, SessionSummary};

const ACTIVE_SESSION_KEY: &str = "active_session";
const HEART_RATE_KEY: &str = "heart_rate_buffer";

/// Aggregate stats over recorded sessions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkoutStats {
    pub total_sessions: u64,
    pub total_duration_min: u64,
    pub total_sets: u64,
    pub total_calories: f64,
    pub today_sessions: u64,
    pub today_duration_min: u64,
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database at `~/.config/fitpulse/fitpulse.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, EngineError> {
        let path = data_dir()?.join("fitpulse.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open at an explicit path (tests, alternate data dirs).
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::QueryFailed("connection lock poisoned".into()))
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS history (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  TEXT NOT NULL,
                workout_id  TEXT NOT NULL,
                started_at  TEXT NOT NULL,
                ended_at    TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                paused_ms   INTEGER NOT NULL,
                exercises_completed INTEGER NOT NULL,
                sets_completed INTEGER NOT NULL,
                calories    REAL NOT NULL,
                avg_bpm     REAL,
                max_bpm     REAL
            );

            CREATE INDEX IF NOT EXISTS idx_history_ended_at ON history(ended_at);
            CREATE INDEX IF NOT EXISTS idx_history_workout_id ON history(workout_id);",
        )?;
        Ok(())
    }

    // ── Key-value primitives ─────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── Fixed-key session records ────────────────────────────────────

    pub fn save_active_session(&self, state: &SessionState) -> Result<(), StorageError> {
        let json = serde_json::to_string(state)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.kv_set(ACTIVE_SESSION_KEY, &json)
    }

    pub fn load_active_session(&self) -> Result<Option<SessionState>, StorageError> {
        let Some(json) = self.kv_get(ACTIVE_SESSION_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::CorruptRecord {
                key: ACTIVE_SESSION_KEY.into(),
                message: e.to_string(),
            })
    }

    pub fn clear_active_session(&self) -> Result<(), StorageError> {
        self.kv_delete(ACTIVE_SESSION_KEY)
    }

    pub fn save_heart_rate(&self, buffer: &HeartRateBuffer) -> Result<(), StorageError> {
        let json = serde_json::to_string(buffer)
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        self.kv_set(HEART_RATE_KEY, &json)
    }

    pub fn load_heart_rate(&self) -> Result<Option<HeartRateBuffer>, StorageError> {
        let Some(json) = self.kv_get(HEART_RATE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::CorruptRecord {
                key: HEART_RATE_KEY.into(),
                message: e.to_string(),
            })
    }

    pub fn clear_heart_rate(&self) -> Result<(), StorageError> {
        self.kv_delete(HEART_RATE_KEY)
    }

    // ── Session history ──────────────────────────────────────────────

    /// Record a finished session for the stats queries.
    pub fn record_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO history (session_id, workout_id, started_at, ended_at, duration_ms,
                                  paused_ms, exercises_completed, sets_completed, calories,
                                  avg_bpm, max_bpm)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                summary.session_id,
                summary.workout_id,
                summary.started_at.to_rfc3339(),
                summary.ended_at.to_rfc3339(),
                summary.duration_ms,
                summary.paused_ms,
                summary.exercises_completed as u64,
                summary.sets_completed as u64,
                summary.calories,
                summary.avg_bpm,
                summary.max_bpm,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn stats_all(&self) -> Result<WorkoutStats, StorageError> {
        let conn = self.lock()?;
        let mut stats = WorkoutStats::default();

        let row = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_ms), 0), COALESCE(SUM(sets_completed), 0),
                    COALESCE(SUM(calories), 0.0)
             FROM history",
            [],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?;
        stats.total_sessions = row.0;
        stats.total_duration_min = row.1 / 60_000;
        stats.total_sets = row.2;
        stats.total_calories = row.3;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let row = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(duration_ms), 0)
                 FROM history WHERE ended_at >= ?1",
                params![format!("{today}T00:00:00+00:00")],
                |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
            )
            .optional()?
            .unwrap_or((0, 0));
        stats.today_sessions = row.0;
        stats.today_duration_min = row.1 / 60_000;

        Ok(stats)
    }
}
