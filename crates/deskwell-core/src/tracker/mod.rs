//! Work-day accounting engine.
//!
//! [`Tracker`] owns the current [`DayState`] behind a single mutex. Every
//! public operation locks, rolls the record over if the local date has
//! changed, applies a total (infallible) transition, and returns the
//! resulting [`Snapshot`]. No operation performs I/O while holding the lock;
//! callers log and prompt with the snapshot they already captured.
//!
//! ## Break settlement
//!
//! Closing a break or media session of duration `d` against the free
//! allowance `F`:
//!
//! ```text
//! break_total += d
//! if d > F { absence_total += d - F; work_effective += F }
//! else     { work_effective += d }
//! ```
//!
//! Media sessions use the identical rule; the two differ only in the label
//! attached by the caller.
//!
//! A session still open when the date rolls over is dropped unsettled -- the
//! new day starts clean. An operation landing exactly at midnight can
//! therefore lose an in-progress session; tests pin that behavior.

mod day;

pub use day::{DayState, Snapshot};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::Serialize;

use crate::clock::{Clock, SystemClock};

/// Which of the two session types an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Idle, lock, or an explicit pause.
    Generic,
    /// Foreground distraction such as video playback.
    Media,
}

/// Snapshot plus session flags, as returned by [`Tracker::status`].
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub day: NaiveDate,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
    pub work_minutes: f64,
    pub break_minutes: f64,
    pub absence_minutes: f64,
    pub in_break: bool,
    pub media_on: bool,
    pub break_started_at: Option<DateTime<Local>>,
}

impl TrackerStatus {
    /// Whether a work session is currently open: started and not yet ended.
    pub fn session_open(&self) -> bool {
        self.started_at.is_some() && self.ended_at.is_none()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            work_minutes: self.work_minutes,
            break_minutes: self.break_minutes,
            absence_minutes: self.absence_minutes,
        }
    }
}

/// Per-day work accounting with the break free-allowance rule.
///
/// Process-lifetime object; safe to share behind an `Arc` and call from any
/// thread. Operations are linearizable: each appears atomic, and no caller
/// ever observes a half-updated day record.
pub struct Tracker {
    state: Mutex<DayState>,
    clock: Arc<dyn Clock>,
    free_allowance: Duration,
}

impl Tracker {
    /// Create a tracker on the system clock.
    pub fn new(break_free_min: u32) -> Self {
        Self::with_clock(break_free_min, Arc::new(SystemClock))
    }

    /// Create a tracker on an injected clock.
    pub fn with_clock(break_free_min: u32, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        Self {
            state: Mutex::new(DayState::new(today)),
            clock,
            free_allowance: Duration::minutes(i64::from(break_free_min)),
        }
    }

    /// Open the work session if not already open. Idempotent.
    pub fn start_work(&self) -> Snapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        rollover_if_needed(&mut state, now);
        if state.started_at.is_none() {
            state.started_at = Some(now);
        }
        state.snapshot()
    }

    /// Close the day: settle any open break/media session as of now and set
    /// the end timestamp. Idempotent.
    pub fn end_work(&self) -> Snapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        rollover_if_needed(&mut state, now);
        self.close_open_sessions(&mut state, now);
        state.ended_at = Some(now);
        state.snapshot()
    }

    /// Credit one active minute.
    ///
    /// No-op unless work has started. The minute counts only when neither a
    /// break nor a media session is open. This is the sole accrual mechanism
    /// for effective work time; the caller contract is at most one call per
    /// minute.
    pub fn tick_active_minute(&self) -> Snapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        rollover_if_needed(&mut state, now);
        if state.started_at.is_some() && !state.in_break && !state.media_on {
            state.work_effective = state.work_effective + Duration::minutes(1);
        }
        state.snapshot()
    }

    /// Open a session of the given kind. No-op if already open.
    pub fn break_start(&self, kind: SessionKind) -> Snapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        rollover_if_needed(&mut state, now);
        match kind {
            SessionKind::Generic => {
                if !state.in_break {
                    state.in_break = true;
                    state.break_started_at = Some(now);
                }
            }
            SessionKind::Media => {
                if !state.media_on {
                    state.media_on = true;
                    state.media_started_at = Some(now);
                }
            }
        }
        state.snapshot()
    }

    /// Close a session of the given kind, settling its duration. No-op if no
    /// such session is open.
    pub fn break_end(&self, kind: SessionKind) -> Snapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        rollover_if_needed(&mut state, now);
        match kind {
            SessionKind::Generic => {
                if let Some(started) = state.break_started_at.take() {
                    state.in_break = false;
                    self.settle(&mut state, started, now);
                }
            }
            SessionKind::Media => {
                if let Some(started) = state.media_started_at.take() {
                    state.media_on = false;
                    self.settle(&mut state, started, now);
                }
            }
        }
        state.snapshot()
    }

    /// Full status view for the scheduler and the HTTP surface.
    pub fn status(&self) -> TrackerStatus {
        let now = self.clock.now();
        let mut state = self.lock();
        rollover_if_needed(&mut state, now);
        let snap = state.snapshot();
        TrackerStatus {
            day: state.day,
            started_at: state.started_at,
            ended_at: state.ended_at,
            work_minutes: snap.work_minutes,
            break_minutes: snap.break_minutes,
            absence_minutes: snap.absence_minutes,
            in_break: state.in_break,
            media_on: state.media_on,
            break_started_at: state.break_started_at,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DayState> {
        // Operations are total; a panic elsewhere must not wedge accounting.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_open_sessions(&self, state: &mut DayState, now: DateTime<Local>) {
        if let Some(started) = state.break_started_at.take() {
            state.in_break = false;
            self.settle(state, started, now);
        }
        if let Some(started) = state.media_started_at.take() {
            state.media_on = false;
            self.settle(state, started, now);
        }
    }

    fn settle(&self, state: &mut DayState, started: DateTime<Local>, now: DateTime<Local>) {
        let dur = (now - started).max(Duration::zero());
        state.break_total = state.break_total + dur;
        if dur > self.free_allowance {
            state.absence_total = state.absence_total + (dur - self.free_allowance);
            state.work_effective = state.work_effective + self.free_allowance;
        } else {
            state.work_effective = state.work_effective + dur;
        }
    }
}

fn rollover_if_needed(state: &mut DayState, now: DateTime<Local>) {
    let today = now.date_naive();
    if state.day != today {
        *state = DayState::new(today);
    }
}
