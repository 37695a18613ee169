//! Activity sampling.
//!
//! Converts the raw "time of last input" signal and the OS lock/unlock
//! callbacks into tracker transitions. The sampler owns `last_input_at`
//! behind its own lock; input collaborators only ever call
//! [`ActivitySampler::notify_input`], arbitrarily often, with no
//! back-pressure -- only the most recent timestamp matters.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local};

use crate::clock::Clock;
use crate::events::{EventKind, EventRecord, EventSink};
use crate::tracker::{SessionKind, Tracker};

/// Inputs older than this count as idle.
const IDLE_AFTER_SECS: i64 = 60;

pub struct ActivitySampler {
    tracker: Arc<Tracker>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    last_input_at: Mutex<DateTime<Local>>,
}

impl ActivitySampler {
    pub fn new(tracker: Arc<Tracker>, events: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            tracker,
            events,
            clock,
            last_input_at: Mutex::new(start),
        }
    }

    /// Record an input event. Last write wins.
    pub fn notify_input(&self, at: DateTime<Local>) {
        let mut last = self
            .last_input_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = at;
    }

    pub fn last_input_at(&self) -> DateTime<Local> {
        *self
            .last_input_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// One per-minute sample; returns whether the user counted as active.
    ///
    /// Active: any open generic break is closed first, then the minute is
    /// credited. Inactive: a generic break is opened instead of crediting,
    /// so idle time beyond the free allowance settles into absence on its
    /// own once the user returns.
    pub fn sample(&self) -> bool {
        let now = self.clock.now();
        let active = now - self.last_input_at() <= Duration::seconds(IDLE_AFTER_SECS);
        if active {
            if self.tracker.status().in_break {
                self.tracker.break_end(SessionKind::Generic);
            }
            self.tracker.tick_active_minute();
        } else {
            self.tracker.break_start(SessionKind::Generic);
        }
        active
    }

    /// OS session locked: open a generic break.
    pub fn on_lock(&self) {
        let snapshot = self.tracker.break_start(SessionKind::Generic);
        self.events.record(EventRecord::new(
            EventKind::Lock,
            "session",
            snapshot,
            self.clock.now(),
        ));
    }

    /// OS session unlocked: close the generic break.
    pub fn on_unlock(&self) {
        let snapshot = self.tracker.break_end(SessionKind::Generic);
        self.events.record(EventRecord::new(
            EventKind::Unlock,
            "session",
            snapshot,
            self.clock.now(),
        ));
    }
}
