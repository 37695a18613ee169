//! Wall-clock abstraction.
//!
//! The tracker and the reminder scheduler never read system time directly --
//! they go through [`Clock`], so day rollover, settlement durations, and
//! debounce windows can be driven deterministically in tests and simulations.
//! Day identity is the *local* calendar date.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local};

/// Source of "now" for every time-dependent decision in the core.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven clock for tests and simulations.
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Local>) {
        *self.now.lock().unwrap() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let start = Local.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
