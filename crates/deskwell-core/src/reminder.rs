//! Minute-tick reminder loop.
//!
//! [`ReminderScheduler::tick`] is the single decision point of the system:
//! it feeds the activity sample into the tracker, then decides which
//! wellness signals are due. Debounce timestamps are the scheduler's only
//! memory; they live apart from the day record and deliberately survive day
//! rollover, so "look away every N minutes" counts from the last real firing
//! even across midnight.
//!
//! Due-decisions are computed and stamped under the scheduler's own lock;
//! collaborator calls (event log, prompts, the end-of-day question) happen
//! after release with the snapshot already captured. The end-of-day question
//! runs on its own thread and its answer is consumed at the start of a later
//! tick, so a human who never answers can never stall the loop.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use chrono::{DateTime, Duration, Local};
use tracing::debug;

use crate::clock::Clock;
use crate::events::{EventKind, EventRecord, EventSink};
use crate::presence::PresenceProbe;
use crate::prompt::{
    EndOfDayAnswer, EndOfDayConfirmer, PromptKind, PromptRequest, Prompter, RevealPredicate,
};
use crate::sampler::ActivitySampler;
use crate::storage::TimingConfig;
use crate::tracker::Tracker;

/// Debounce memory. Independent lifecycle from the day record.
#[derive(Debug)]
struct ReminderState {
    last_look_away: Option<DateTime<Local>>,
    last_standup_prompt: Option<DateTime<Local>>,
    last_standup_reset: DateTime<Local>,
    end_target: Duration,
    /// An end-of-day question is out and unanswered.
    eod_pending: bool,
}

pub struct ReminderScheduler {
    tracker: Arc<Tracker>,
    sampler: Arc<ActivitySampler>,
    presence: Arc<dyn PresenceProbe>,
    prompter: Arc<dyn Prompter>,
    confirmer: Arc<dyn EndOfDayConfirmer>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    look_far_every: Duration,
    stand_up_every: Duration,
    standup_reset_idle: Duration,
    extend_block: Duration,
    state: Mutex<ReminderState>,
    answer_tx: Sender<EndOfDayAnswer>,
    answer_rx: Mutex<Receiver<EndOfDayAnswer>>,
}

impl ReminderScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timing: &TimingConfig,
        tracker: Arc<Tracker>,
        sampler: Arc<ActivitySampler>,
        presence: Arc<dyn PresenceProbe>,
        prompter: Arc<dyn Prompter>,
        confirmer: Arc<dyn EndOfDayConfirmer>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (answer_tx, answer_rx) = mpsc::channel();
        let now = clock.now();
        Self {
            tracker,
            sampler,
            presence,
            prompter,
            confirmer,
            events,
            clock,
            look_far_every: Duration::minutes(i64::from(timing.look_far_every_min)),
            stand_up_every: Duration::minutes(i64::from(timing.stand_up_every_min)),
            standup_reset_idle: Duration::minutes(i64::from(timing.standup_reset_idle_min)),
            extend_block: Duration::minutes(i64::from(timing.extend_block_min)),
            state: Mutex::new(ReminderState {
                last_look_away: None,
                last_standup_prompt: None,
                last_standup_reset: now,
                end_target: Duration::minutes(i64::from(timing.work_target_min)),
                eod_pending: false,
            }),
            answer_tx,
            answer_rx: Mutex::new(answer_rx),
        }
    }

    /// Current end-of-day target in minutes. Grows via the extend path.
    pub fn target_minutes(&self) -> f64 {
        self.lock_state().end_target.num_minutes() as f64
    }

    /// One scheduler tick. Quick and non-blocking.
    pub fn tick(&self) {
        self.apply_pending_answers();

        self.sampler.sample();

        let now = self.clock.now();
        let status = self.tracker.status();
        let snapshot = status.snapshot();
        let session_open = status.session_open();
        let in_call = self.presence.is_in_call();

        let mut fire_look_away = false;
        let mut fire_stand_up = false;
        let mut ask_eod = false;
        {
            let mut state = self.lock_state();

            // Extended idleness implies the user left the desk, which
            // satisfies the stand-up requirement.
            if status.in_break {
                if let Some(since) = status.break_started_at {
                    if now - since >= self.standup_reset_idle {
                        state.last_standup_reset = now;
                    }
                }
            }

            if session_open {
                if state
                    .last_look_away
                    .map_or(true, |t| now - t >= self.look_far_every)
                {
                    state.last_look_away = Some(now);
                    fire_look_away = true;
                }

                let overdue = now - state.last_standup_reset >= self.stand_up_every;
                let debounced = state
                    .last_standup_prompt
                    .map_or(true, |t| now - t >= self.stand_up_every);
                if overdue && debounced {
                    state.last_standup_prompt = Some(now);
                    fire_stand_up = true;
                }

                let target_min = state.end_target.num_minutes() as f64;
                if !state.eod_pending && snapshot.work_minutes >= target_min {
                    state.eod_pending = true;
                    ask_eod = true;
                }
            }
        }

        if fire_look_away {
            self.events
                .record(EventRecord::new(EventKind::LookfarShow, "", snapshot, now));
            self.prompter
                .show(self.prompt_request(PromptKind::LookFar, in_call));
        }

        if fire_stand_up {
            self.events
                .record(EventRecord::new(EventKind::StandupShow, "", snapshot, now));
            self.prompter
                .show(self.prompt_request(PromptKind::StandUp, in_call));
        }

        if ask_eod {
            debug!(
                work_minutes = snapshot.work_minutes,
                "work target reached, asking whether to end the day"
            );
            let confirmer = Arc::clone(&self.confirmer);
            let tx = self.answer_tx.clone();
            thread::spawn(move || {
                let _ = tx.send(confirmer.ask());
            });
        }
    }

    fn prompt_request(&self, kind: PromptKind, in_call: bool) -> PromptRequest {
        let reveal_when = in_call.then(|| {
            let presence = Arc::clone(&self.presence);
            Box::new(move || !presence.is_in_call()) as RevealPredicate
        });
        PromptRequest {
            kind,
            minimized: in_call,
            reveal_when,
        }
    }

    fn apply_pending_answers(&self) {
        let answers: Vec<EndOfDayAnswer> = {
            let rx = self.answer_rx.lock().unwrap_or_else(PoisonError::into_inner);
            rx.try_iter().collect()
        };
        for answer in answers {
            match answer {
                EndOfDayAnswer::End => {
                    let snapshot = self.tracker.end_work();
                    self.events.record(EventRecord::new(
                        EventKind::EndWork,
                        "auto by target",
                        snapshot,
                        self.clock.now(),
                    ));
                }
                EndOfDayAnswer::Extend => {
                    let extend_min = self.extend_block.num_minutes();
                    {
                        let mut state = self.lock_state();
                        state.end_target = state.end_target + self.extend_block;
                    }
                    let snapshot = self.tracker.status().snapshot();
                    self.events.record(EventRecord::new(
                        EventKind::ExtendDay,
                        format!("+{extend_min} min"),
                        snapshot,
                        self.clock.now(),
                    ));
                }
            }
            self.lock_state().eod_pending = false;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ReminderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::NullSink;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration as StdDuration;

    struct RecordingPrompter {
        shown: Mutex<Vec<(PromptKind, bool)>>,
    }

    impl RecordingPrompter {
        fn new() -> Self {
            Self {
                shown: Mutex::new(Vec::new()),
            }
        }

        fn shown(&self) -> Vec<(PromptKind, bool)> {
            self.shown.lock().unwrap().clone()
        }
    }

    impl Prompter for RecordingPrompter {
        fn show(&self, request: PromptRequest) {
            self.shown
                .lock()
                .unwrap()
                .push((request.kind, request.minimized));
        }
    }

    struct StaticPresence(AtomicBool);

    impl PresenceProbe for StaticPresence {
        fn is_in_call(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct FixedConfirmer {
        answer: EndOfDayAnswer,
        asks: std::sync::atomic::AtomicUsize,
    }

    impl FixedConfirmer {
        fn new(answer: EndOfDayAnswer) -> Self {
            Self {
                answer,
                asks: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    impl EndOfDayConfirmer for FixedConfirmer {
        fn ask(&self) -> EndOfDayAnswer {
            self.asks.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    struct Harness {
        tracker: Arc<Tracker>,
        sampler: Arc<ActivitySampler>,
        clock: Arc<ManualClock>,
        prompter: Arc<RecordingPrompter>,
        presence: Arc<StaticPresence>,
        confirmer: Arc<FixedConfirmer>,
        scheduler: ReminderScheduler,
    }

    fn harness(timing: TimingConfig, answer: EndOfDayAnswer) -> Harness {
        harness_at(timing, answer, Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap())
    }

    fn harness_at(timing: TimingConfig, answer: EndOfDayAnswer, start: DateTime<Local>) -> Harness {
        let clock = Arc::new(ManualClock::new(start));
        let tracker = Arc::new(Tracker::with_clock(timing.break_free_min, clock.clone()));
        let events: Arc<dyn EventSink> = Arc::new(NullSink);
        let sampler = Arc::new(ActivitySampler::new(
            tracker.clone(),
            events.clone(),
            clock.clone(),
        ));
        let prompter = Arc::new(RecordingPrompter::new());
        let presence = Arc::new(StaticPresence(AtomicBool::new(false)));
        let confirmer = Arc::new(FixedConfirmer::new(answer));
        let scheduler = ReminderScheduler::new(
            &timing,
            tracker.clone(),
            sampler.clone(),
            presence.clone(),
            prompter.clone(),
            confirmer.clone(),
            events,
            clock.clone(),
        );
        Harness {
            tracker,
            sampler,
            clock,
            prompter,
            presence,
            confirmer,
            scheduler,
        }
    }

    /// Advance one minute, keep the sampler fed, tick.
    fn active_minute(h: &Harness) {
        h.clock.advance(Duration::minutes(1));
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();
    }

    /// Wait until the confirmation thread's answer has been consumed.
    fn settle_answer(h: &Harness, mut done: impl FnMut() -> bool) {
        for _ in 0..100 {
            thread::sleep(StdDuration::from_millis(5));
            h.scheduler.tick();
            if done() {
                return;
            }
        }
        panic!("end-of-day answer never settled");
    }

    #[test]
    fn no_reminders_before_work_starts() {
        let h = harness(TimingConfig::default(), EndOfDayAnswer::End);
        for _ in 0..30 {
            active_minute(&h);
        }
        assert!(h.prompter.shown().is_empty());
    }

    #[test]
    fn look_away_fires_on_schedule() {
        let h = harness(TimingConfig::default(), EndOfDayAnswer::End);
        h.tracker.start_work();

        // First tick after start: unset timestamp means due immediately.
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();
        assert_eq!(h.prompter.shown().len(), 1);

        // Fires again at minute 20 and 40, and only then.
        for _ in 0..40 {
            active_minute(&h);
        }
        let look_aways: Vec<_> = h
            .prompter
            .shown()
            .into_iter()
            .filter(|(k, _)| *k == PromptKind::LookFar)
            .collect();
        assert_eq!(look_aways.len(), 3);
    }

    #[test]
    fn look_away_does_not_double_fire_on_fast_ticks() {
        let h = harness(TimingConfig::default(), EndOfDayAnswer::End);
        h.tracker.start_work();

        // Tick every 30 seconds for 21 minutes of wall time. The first tick
        // fires (unset debounce); the next firing is due a full 20 minutes
        // later, regardless of how often ticks arrive in between.
        for _ in 0..42 {
            h.clock.advance(Duration::seconds(30));
            h.sampler.notify_input(h.clock.now());
            h.scheduler.tick();
        }
        let look_aways = h
            .prompter
            .shown()
            .iter()
            .filter(|(k, _)| *k == PromptKind::LookFar)
            .count();
        // Once at the first tick, once at the 20-minute mark.
        assert_eq!(look_aways, 2);
    }

    #[test]
    fn stand_up_fires_after_an_hour_at_the_desk() {
        let h = harness(TimingConfig::default(), EndOfDayAnswer::End);
        h.tracker.start_work();
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();

        for _ in 0..59 {
            active_minute(&h);
        }
        assert_eq!(
            h.prompter
                .shown()
                .iter()
                .filter(|(k, _)| *k == PromptKind::StandUp)
                .count(),
            0
        );

        active_minute(&h);
        assert_eq!(
            h.prompter
                .shown()
                .iter()
                .filter(|(k, _)| *k == PromptKind::StandUp)
                .count(),
            1
        );
    }

    #[test]
    fn extended_idleness_resets_the_standup_timer() {
        let h = harness(TimingConfig::default(), EndOfDayAnswer::End);
        h.tracker.start_work();
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();

        // 55 active minutes, then a 5-minute idle stretch (>= the 2-minute
        // reset threshold) that the scheduler reads as standing up.
        for _ in 0..55 {
            active_minute(&h);
        }
        for _ in 0..5 {
            h.clock.advance(Duration::minutes(1));
            h.scheduler.tick();
        }
        // Back to work for another 30 minutes: still no stand-up prompt,
        // because the reset pushed the due time out.
        for _ in 0..30 {
            active_minute(&h);
        }
        assert_eq!(
            h.prompter
                .shown()
                .iter()
                .filter(|(k, _)| *k == PromptKind::StandUp)
                .count(),
            0
        );
    }

    #[test]
    fn prompts_minimize_while_in_a_call() {
        let h = harness(TimingConfig::default(), EndOfDayAnswer::End);
        h.tracker.start_work();
        h.presence.0.store(true, Ordering::SeqCst);
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();

        let shown = h.prompter.shown();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].1, "prompt should start minimized during a call");
    }

    #[test]
    fn end_of_day_asks_once_and_ends_on_end() {
        let timing = TimingConfig {
            work_target_min: 5,
            ..TimingConfig::default()
        };
        let h = harness(timing, EndOfDayAnswer::End);
        h.tracker.start_work();

        for _ in 0..5 {
            active_minute(&h);
        }
        // Target reached; the question is out. The answer lands on a later
        // tick without the clock moving.
        settle_answer(&h, || h.tracker.status().ended_at.is_some());

        let status = h.tracker.status();
        assert!(!status.session_open());
        assert_eq!(h.confirmer.asks.load(Ordering::SeqCst), 1);

        // No further asks once the session is closed.
        for _ in 0..5 {
            h.scheduler.tick();
        }
        thread::sleep(StdDuration::from_millis(20));
        assert_eq!(h.confirmer.asks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn end_of_day_extend_raises_the_target() {
        let timing = TimingConfig {
            work_target_min: 5,
            extend_block_min: 15,
            ..TimingConfig::default()
        };
        let h = harness(timing, EndOfDayAnswer::Extend);
        h.tracker.start_work();

        for _ in 0..5 {
            active_minute(&h);
        }
        settle_answer(&h, || h.scheduler.target_minutes() == 20.0);

        assert_eq!(h.scheduler.target_minutes(), 20.0);
        assert!(h.tracker.status().session_open());
    }

    #[test]
    fn reminder_state_survives_day_rollover() {
        // Fire a look-away shortly before midnight, then cross into the next
        // day: the day record resets to zero, but the look-away debounce
        // keeps counting from the pre-midnight firing.
        let h = harness_at(
            TimingConfig::default(),
            EndOfDayAnswer::End,
            Local.with_ymd_and_hms(2025, 3, 10, 23, 50, 0).unwrap(),
        );
        h.tracker.start_work();
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();
        assert_eq!(h.prompter.shown().len(), 1);

        // 00:05 next day: the rollover wiped the day (work session must be
        // reopened), and only 15 of the 20 debounce minutes have passed.
        h.clock.set(Local.with_ymd_and_hms(2025, 3, 11, 0, 5, 0).unwrap());
        h.tracker.start_work();
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();
        assert_eq!(h.tracker.status().work_minutes, 1.0);
        assert_eq!(h.prompter.shown().len(), 1, "still inside the debounce window");

        // 00:11: twenty-one minutes since the last firing.
        h.clock.set(Local.with_ymd_and_hms(2025, 3, 11, 0, 11, 0).unwrap());
        h.sampler.notify_input(h.clock.now());
        h.scheduler.tick();
        assert_eq!(h.prompter.shown().len(), 2);
    }
}
