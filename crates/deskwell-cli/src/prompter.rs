//! Command-based prompt collaborators.
//!
//! Headless stand-ins for popup windows: each prompt kind can be bound to a
//! shell command (a dialog tool, a notifier, a script). The command's run
//! time is recorded as the prompt's reaction latency. A prompt dispatched
//! mid-call waits for its reveal predicate before launching anything, which
//! is the headless equivalent of opening minimized and surfacing later.

use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use deskwell_core::storage::PromptsConfig;
use deskwell_core::{
    EndOfDayAnswer, EndOfDayConfirmer, PromptKind, PromptRequest, Prompter, SqliteEventSink,
};
use tracing::{info, warn};

/// How often a minimized prompt polls its reveal predicate.
const REVEAL_POLL: Duration = Duration::from_secs(2);

pub struct CommandPrompter {
    config: PromptsConfig,
    sink: Arc<SqliteEventSink>,
}

impl CommandPrompter {
    pub fn new(config: PromptsConfig, sink: Arc<SqliteEventSink>) -> Self {
        Self { config, sink }
    }

    fn command_for(&self, kind: PromptKind) -> Option<String> {
        match kind {
            PromptKind::LookFar => self.config.look_far_command.clone(),
            PromptKind::StandUp => self.config.stand_up_command.clone(),
        }
    }
}

impl Prompter for CommandPrompter {
    fn show(&self, request: PromptRequest) {
        let command = self.command_for(request.kind);
        let uncloseable_s = self.config.look_far_uncloseable_s;
        let sink = Arc::clone(&self.sink);
        thread::spawn(move || {
            // The watcher is not cancellable; running until the predicate
            // turns true or the process exits is an accepted cost.
            if let Some(reveal_when) = request.reveal_when {
                while !reveal_when() {
                    thread::sleep(REVEAL_POLL);
                }
            }

            let Some(command) = command else {
                // The *_show event record is the whole prompt.
                return;
            };

            let shown = Instant::now();
            let status = shell(&command)
                .env("DESKWELL_PROMPT", request.kind.as_str())
                .env("DESKWELL_UNCLOSEABLE_S", uncloseable_s.to_string())
                .status();
            match status {
                Ok(_) => {
                    let reaction = shown.elapsed().as_secs_f64();
                    sink.with(|db| {
                        if let Err(err) =
                            db.record_reaction(Local::now(), request.kind, reaction, "closed")
                        {
                            warn!(%err, "failed to record prompt reaction");
                        }
                    });
                }
                Err(err) => {
                    warn!(kind = request.kind.as_str(), %err, "prompt command failed to start");
                }
            }
        });
    }
}

/// End-of-day question via a yes/no command (exit 0 ends the day).
pub struct CommandConfirmer {
    command: Option<String>,
}

impl CommandConfirmer {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

impl EndOfDayConfirmer for CommandConfirmer {
    fn ask(&self) -> EndOfDayAnswer {
        let Some(command) = &self.command else {
            // Nothing to ask with: the day ends at the target.
            info!("no end-of-day command configured, ending the day at target");
            return EndOfDayAnswer::End;
        };
        match shell(command).status() {
            Ok(status) if status.success() => EndOfDayAnswer::End,
            Ok(_) => EndOfDayAnswer::Extend,
            Err(err) => {
                warn!(%err, "end-of-day command failed to start, ending the day");
                EndOfDayAnswer::End
            }
        }
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
