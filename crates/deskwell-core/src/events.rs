//! Activity event records.
//!
//! Every externally visible state change produces an [`EventRecord`] carrying
//! the day's counters at that moment. Records are handed to an [`EventSink`];
//! sinks are append-only and fire-and-forget -- the accounting engine never
//! waits on them and never observes their failures.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::tracker::Snapshot;

/// Kind tag for an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StartWork,
    EndWork,
    Lock,
    Unlock,
    BreakStart,
    BreakEnd,
    MediaStart,
    MediaStop,
    LookfarShow,
    LookfarClose,
    StandupShow,
    StandupClose,
    ExtendDay,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::StartWork => "start_work",
            EventKind::EndWork => "end_work",
            EventKind::Lock => "lock",
            EventKind::Unlock => "unlock",
            EventKind::BreakStart => "break_start",
            EventKind::BreakEnd => "break_end",
            EventKind::MediaStart => "media_start",
            EventKind::MediaStop => "media_stop",
            EventKind::LookfarShow => "lookfar_show",
            EventKind::LookfarClose => "lookfar_close",
            EventKind::StandupShow => "standup_show",
            EventKind::StandupClose => "standup_close",
            EventKind::ExtendDay => "extend_day",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event row: what happened, plus the day's counters when it happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub at: DateTime<Local>,
    pub kind: EventKind,
    pub details: String,
    pub work_minutes: f64,
    pub break_minutes: f64,
    pub absence_minutes: f64,
}

impl EventRecord {
    pub fn new(
        kind: EventKind,
        details: impl Into<String>,
        snapshot: Snapshot,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            at,
            kind,
            details: details.into(),
            work_minutes: snapshot.work_minutes,
            break_minutes: snapshot.break_minutes,
            absence_minutes: snapshot.absence_minutes,
        }
    }
}

/// Append-only consumer of event records.
///
/// Implementations own their durability strategy. `record` must return
/// promptly and swallow its own failures; accounting correctness never
/// depends on the log.
pub trait EventSink: Send + Sync {
    fn record(&self, event: EventRecord);
}

/// Sink that drops every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: EventRecord) {}
}
