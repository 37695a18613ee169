//! # deskwell core library
//!
//! Core logic for deskwell, a single-user work-day wellness tracker: it
//! accounts for work, break, and absence time across one calendar day and
//! decides, once per minute, when to fire "look away", "stand up", and
//! end-of-day signals.
//!
//! ## Architecture
//!
//! - **Tracker**: the per-day accounting state machine. One mutex, total
//!   operations, day rollover on every call. The caller drives it; the
//!   engine has no threads of its own.
//! - **ActivitySampler**: turns "time of last input" and lock/unlock
//!   callbacks into tracker transitions.
//! - **ReminderScheduler**: the minute tick. Reads the tracker, applies its
//!   own debounce state, and emits signals through collaborator traits.
//! - **Collaborators**: prompts, end-of-day confirmation, presence probe,
//!   and the event log are capability traits ([`Prompter`],
//!   [`EndOfDayConfirmer`], [`PresenceProbe`], [`EventSink`]); the daemon
//!   picks the implementations.
//! - **Storage**: SQLite event/reaction log and TOML configuration.
//!
//! ## Key Components
//!
//! - [`Tracker`]: accounting engine with the break free-allowance rule
//! - [`ReminderScheduler`]: the decision loop
//! - [`Config`]: application configuration
//! - [`Database`]: append-only activity log

pub mod clock;
pub mod error;
pub mod events;
pub mod presence;
pub mod prompt;
pub mod reminder;
pub mod sampler;
pub mod storage;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::{EventKind, EventRecord, EventSink, NullSink};
pub use presence::{GraphPresence, PresenceProbe};
pub use prompt::{
    EndOfDayAnswer, EndOfDayConfirmer, PromptKind, PromptRequest, Prompter, RevealPredicate,
};
pub use reminder::ReminderScheduler;
pub use sampler::ActivitySampler;
pub use storage::{Config, Database, SqliteEventSink};
pub use tracker::{DayState, SessionKind, Snapshot, Tracker, TrackerStatus};
