//! Prompt and confirmation capability interfaces.
//!
//! The core decides *when* a prompt is due; collaborators decide what a
//! prompt looks like. A collaborator receives one [`PromptRequest`] per
//! firing and owns everything after dispatch: presentation, the optional
//! reveal watcher, and reaction-latency logging.

use serde::Serialize;

/// Which wellness prompt to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    LookFar,
    StandUp,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::LookFar => "look_far",
            PromptKind::StandUp => "stand_up",
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate polled by the collaborator to decide when a minimized prompt
/// should surface.
pub type RevealPredicate = Box<dyn Fn() -> bool + Send + 'static>;

/// A single prompt dispatch.
pub struct PromptRequest {
    pub kind: PromptKind,
    /// Start out of the way (the user is in a call).
    pub minimized: bool,
    /// When set, surface the prompt once the predicate turns true.
    pub reveal_when: Option<RevealPredicate>,
}

/// Prompt collaborator.
pub trait Prompter: Send + Sync {
    /// Dispatch a prompt. Must return promptly: any watcher loop, user
    /// interaction, and reaction measurement belong to the implementor.
    fn show(&self, request: PromptRequest);
}

/// Answer to the end-of-day confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfDayAnswer {
    /// Close the work session now.
    End,
    /// Keep going; raise the target by one extend block.
    Extend,
}

/// Blocking end-of-day question.
///
/// The scheduler calls this from a dedicated thread and consumes the answer
/// on a later tick; waiting indefinitely for a human is acceptable here and
/// must never stall the tick itself.
pub trait EndOfDayConfirmer: Send + Sync {
    fn ask(&self) -> EndOfDayAnswer;
}
