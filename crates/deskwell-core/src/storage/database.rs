//! SQLite-backed event and reaction log.
//!
//! Two append-only tables:
//! - `events` -- one row per [`EventRecord`] (what happened plus the day's
//!   counters at that moment)
//! - `reactions` -- prompt reaction latencies reported by the prompt
//!   collaborator

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::warn;

use super::data_dir;
use crate::events::{EventRecord, EventSink};
use crate::prompt::PromptKind;

/// One persisted event row.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    pub at: String,
    pub kind: String,
    pub details: String,
    pub work_minutes: f64,
    pub break_minutes: f64,
    pub absence_minutes: f64,
}

/// One persisted prompt reaction row.
#[derive(Debug, Clone, Serialize)]
pub struct StoredReaction {
    pub id: i64,
    pub at: String,
    pub kind: String,
    pub reaction_seconds: f64,
    pub comment: String,
}

/// SQLite database for the activity log.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/deskwell/deskwell.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("deskwell.db");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                at              TEXT NOT NULL,
                kind            TEXT NOT NULL,
                details         TEXT NOT NULL DEFAULT '',
                work_minutes    REAL NOT NULL,
                break_minutes   REAL NOT NULL,
                absence_minutes REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reactions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                at               TEXT NOT NULL,
                kind             TEXT NOT NULL,
                reaction_seconds REAL NOT NULL,
                comment          TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_events_at ON events(at);
            CREATE INDEX IF NOT EXISTS idx_events_kind ON events(kind);",
        )?;
        Ok(())
    }

    /// Append one event row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_event(&self, event: &EventRecord) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO events (at, kind, details, work_minutes, break_minutes, absence_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.at.to_rfc3339(),
                event.kind.as_str(),
                event.details,
                event.work_minutes,
                event.break_minutes,
                event.absence_minutes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent event rows, newest first.
    pub fn recent_events(&self, limit: u32) -> Result<Vec<StoredEvent>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, at, kind, details, work_minutes, break_minutes, absence_minutes
             FROM events ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(StoredEvent {
                id: row.get(0)?,
                at: row.get(1)?,
                kind: row.get(2)?,
                details: row.get(3)?,
                work_minutes: row.get(4)?,
                break_minutes: row.get(5)?,
                absence_minutes: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    /// Append one prompt reaction row.
    pub fn record_reaction(
        &self,
        at: DateTime<Local>,
        kind: PromptKind,
        reaction_seconds: f64,
        comment: &str,
    ) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO reactions (at, kind, reaction_seconds, comment)
             VALUES (?1, ?2, ?3, ?4)",
            params![at.to_rfc3339(), kind.as_str(), reaction_seconds, comment],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent reaction rows, newest first.
    pub fn recent_reactions(&self, limit: u32) -> Result<Vec<StoredReaction>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, at, kind, reaction_seconds, comment
             FROM reactions ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(StoredReaction {
                id: row.get(0)?,
                at: row.get(1)?,
                kind: row.get(2)?,
                reaction_seconds: row.get(3)?,
                comment: row.get(4)?,
            })
        })?;
        rows.collect()
    }
}

/// Mutex-wrapped database usable as an [`EventSink`] from any thread.
///
/// Insert failures are logged and swallowed: accounting never depends on log
/// durability.
pub struct SqliteEventSink {
    db: Mutex<Database>,
}

impl SqliteEventSink {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Run `f` against the underlying database.
    pub fn with<T>(&self, f: impl FnOnce(&Database) -> T) -> T {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        f(&db)
    }
}

impl EventSink for SqliteEventSink {
    fn record(&self, event: EventRecord) {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = db.record_event(&event) {
            warn!(kind = event.kind.as_str(), %err, "failed to append event record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::tracker::Snapshot;

    fn snapshot() -> Snapshot {
        Snapshot {
            work_minutes: 120.0,
            break_minutes: 15.0,
            absence_minutes: 0.0,
        }
    }

    #[test]
    fn records_and_lists_events() {
        let db = Database::open_memory().unwrap();
        let now = Local::now();
        db.record_event(&EventRecord::new(EventKind::StartWork, "manual", snapshot(), now))
            .unwrap();
        db.record_event(&EventRecord::new(EventKind::LookfarShow, "", snapshot(), now))
            .unwrap();

        let events = db.recent_events(10).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first.
        assert_eq!(events[0].kind, "lookfar_show");
        assert_eq!(events[1].kind, "start_work");
        assert_eq!(events[1].details, "manual");
        assert_eq!(events[1].work_minutes, 120.0);
    }

    #[test]
    fn limit_caps_the_listing() {
        let db = Database::open_memory().unwrap();
        let now = Local::now();
        for _ in 0..5 {
            db.record_event(&EventRecord::new(EventKind::BreakStart, "", snapshot(), now))
                .unwrap();
        }
        assert_eq!(db.recent_events(3).unwrap().len(), 3);
    }

    #[test]
    fn records_reactions() {
        let db = Database::open_memory().unwrap();
        db.record_reaction(Local::now(), PromptKind::LookFar, 4.2, "closed")
            .unwrap();
        let rows = db.recent_reactions(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "look_far");
        assert_eq!(rows[0].reaction_seconds, 4.2);
    }

    #[test]
    fn sink_swallows_nothing_on_success() {
        let sink = SqliteEventSink::new(Database::open_memory().unwrap());
        sink.record(EventRecord::new(EventKind::Lock, "session", snapshot(), Local::now()));
        let count = sink.with(|db| db.recent_events(10).unwrap().len());
        assert_eq!(count, 1);
    }
}
