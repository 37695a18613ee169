//! Per-day accounting record.

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Read-only view of the day's counters, in minutes rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub work_minutes: f64,
    pub break_minutes: f64,
    pub absence_minutes: f64,
}

/// Accounting record for one calendar day.
///
/// Owned exclusively by [`Tracker`](super::Tracker) and replaced wholesale
/// when the local date advances past `day`. At most one break session and one
/// media session may be open at a time; `in_break` and `break_started_at` are
/// set together or not at all, likewise the media pair.
#[derive(Debug, Clone)]
pub struct DayState {
    pub day: NaiveDate,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
    pub work_effective: Duration,
    pub break_total: Duration,
    pub absence_total: Duration,
    pub in_break: bool,
    pub break_started_at: Option<DateTime<Local>>,
    pub media_on: bool,
    pub media_started_at: Option<DateTime<Local>>,
}

impl DayState {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day,
            started_at: None,
            ended_at: None,
            work_effective: Duration::zero(),
            break_total: Duration::zero(),
            absence_total: Duration::zero(),
            in_break: false,
            break_started_at: None,
            media_on: false,
            media_started_at: None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            work_minutes: round_minutes(self.work_effective),
            break_minutes: round_minutes(self.break_total),
            absence_minutes: round_minutes(self.absence_total),
        }
    }
}

fn round_minutes(d: Duration) -> f64 {
    let minutes = d.num_seconds() as f64 / 60.0;
    (minutes * 10.0).round() / 10.0
}
