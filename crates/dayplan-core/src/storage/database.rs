//! SQLite-based session history.
//!
//! Provides persistent storage for:
//! - Executed plans, one row per timer session
//! - Normalised block rows with a completion flag
//! - Aggregate statistics over completed work and breaks

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError};
use crate::schedule::{Block, BlockKind};
use crate::summary::PlanSummary;

/// One recorded timer session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub session_id: String,
    pub date: NaiveDate,
    pub blocks: Vec<Block>,
    pub completed_blocks: Vec<usize>,
    pub summary: PlanSummary,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Completed work blocks.
    pub fn completed_pomodoros(&self) -> usize {
        self.completed_blocks
            .iter()
            .filter_map(|&i| self.blocks.get(i))
            .filter(|b| b.kind == BlockKind::Work)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StorageStats {
    pub total_sessions: u64,
    pub completed_pomodoros: u64,
    pub total_focus_min: u64,
    pub total_break_min: u64,
}

/// SQLite database for session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/dayplan/history.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("history.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id       TEXT UNIQUE NOT NULL,
                date             TEXT NOT NULL,
                blocks           TEXT NOT NULL,
                completed_blocks TEXT NOT NULL,
                summary          TEXT NOT NULL,
                notes            TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS blocks (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id   TEXT NOT NULL REFERENCES sessions(session_id),
                block_index  INTEGER NOT NULL,
                start_time   TEXT NOT NULL,
                end_time     TEXT NOT NULL,
                type         TEXT NOT NULL,
                title        TEXT NOT NULL,
                task_id      TEXT,
                duration_min INTEGER NOT NULL,
                completed    INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);
            CREATE INDEX IF NOT EXISTS idx_blocks_session ON blocks(session_id);
            CREATE INDEX IF NOT EXISTS idx_blocks_type_completed ON blocks(type, completed);",
        )?;
        Ok(())
    }

    /// Record an executed plan and its per-block completion.
    ///
    /// # Errors
    /// Returns an error if serialization or an insert fails.
    pub fn record_session(
        &self,
        session_id: &str,
        date: NaiveDate,
        blocks: &[Block],
        completed: &[usize],
        summary: &PlanSummary,
        notes: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let encode = |e: serde_json::Error| DatabaseError::QueryFailed(e.to_string());
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO sessions (session_id, date, blocks, completed_blocks, summary, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session_id,
                date.format("%Y-%m-%d").to_string(),
                serde_json::to_string(blocks).map_err(encode)?,
                serde_json::to_string(completed).map_err(encode)?,
                serde_json::to_string(summary).map_err(encode)?,
                notes,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let row_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO blocks (session_id, block_index, start_time, end_time, type, title, task_id, duration_min, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (index, block) in blocks.iter().enumerate() {
                stmt.execute(params![
                    session_id,
                    index as i64,
                    block.start.to_rfc3339(),
                    block.end.to_rfc3339(),
                    block.kind.as_str(),
                    block.title,
                    block.task_id,
                    block.duration_minutes(),
                    completed.contains(&index),
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(session_id, blocks = blocks.len(), "session recorded");
        Ok(row_id)
    }

    /// Sessions recorded for `date`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn sessions_on(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, date, blocks, completed_blocks, summary, notes, created_at
             FROM sessions
             WHERE date = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, date, blocks, completed, summary, notes, created_at) = row?;
            let corrupt = |message: String| DatabaseError::CorruptRow {
                table: "sessions".into(),
                message: format!("row {id}: {message}"),
            };
            records.push(SessionRecord {
                id,
                session_id,
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|e| corrupt(e.to_string()))?,
                blocks: serde_json::from_str(&blocks).map_err(|e| corrupt(e.to_string()))?,
                completed_blocks: serde_json::from_str(&completed)
                    .map_err(|e| corrupt(e.to_string()))?,
                summary: serde_json::from_str(&summary).map_err(|e| corrupt(e.to_string()))?,
                notes,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| corrupt(e.to_string()))?
                    .with_timezone(&Utc),
            });
        }
        Ok(records)
    }

    /// All-time totals over recorded sessions.
    ///
    /// # Errors
    /// Returns an error if a query fails.
    pub fn stats(&self) -> Result<StorageStats, DatabaseError> {
        let mut stats = StorageStats {
            total_sessions: self
                .conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?,
            ..StorageStats::default()
        };

        let mut stmt = self.conn.prepare(
            "SELECT type, COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM blocks
             WHERE completed = 1
             GROUP BY type",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        for row in rows {
            let (kind, count, minutes) = row?;
            match kind.as_str() {
                "work" => {
                    stats.completed_pomodoros += count;
                    stats.total_focus_min += minutes;
                }
                "break" | "long_break" => stats.total_break_min += minutes,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Delete sessions dated before `cutoff`. Returns the number removed.
    ///
    /// # Errors
    /// Returns an error if a delete fails.
    pub fn cleanup_before(&self, cutoff: NaiveDate) -> Result<usize, DatabaseError> {
        let cutoff = cutoff.format("%Y-%m-%d").to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM blocks WHERE session_id IN (SELECT session_id FROM sessions WHERE date < ?1)",
            params![cutoff],
        )?;
        let removed = tx.execute("DELETE FROM sessions WHERE date < ?1", params![cutoff])?;
        tx.commit()?;
        Ok(removed)
    }

    /// Delete sessions older than `days` days (UTC calendar).
    ///
    /// # Errors
    /// Returns an error if a delete fails.
    pub fn cleanup_older_than(&self, days: u32) -> Result<usize, DatabaseError> {
        let cutoff = Utc::now().date_naive() - Duration::days(i64::from(days));
        let removed = self.cleanup_before(cutoff)?;
        tracing::info!(removed, days, "old sessions cleaned up");
        Ok(removed)
    }
}
