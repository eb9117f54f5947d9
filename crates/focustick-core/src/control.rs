//! External control channel and the state-owning timer service.
//!
//! Commands may arrive from a process that does not hold the in-memory
//! record (a menu-bar surface, a CLI invocation, a widget). Every
//! command goes through the same path: read-reconcile, apply a phase
//! engine operation, write the result back to both stores, notify.
//! Nothing patches a store field in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::events::Event;
use crate::reconcile;
use crate::storage::{Config, DurableStore, SharedStore};
use crate::timer::{engine, RunState, TimerConfig, TimerRecord};

/// Inbound control command. No payload beyond the command itself; the
/// timer is a singleton per namespace. Delivery is at-least-once and
/// duplicates within one reconciliation window behave like a normal
/// double-press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Toggle,
    Skip,
    ResetRequested,
}

/// Best-effort nudge toward the primary process so its in-memory state
/// converges without waiting for its own next reconciliation. Losing a
/// notification is fine; the stores already hold the truth.
pub trait Notify {
    fn notify(&self, event: &Event);
}

/// The single state-owning component.
///
/// Owns handles to both stores; every read goes through
/// [`crate::reconcile`] and every mutation is written back to both
/// stores as a complete snapshot before the event is emitted.
pub struct TimerService {
    shared: SharedStore,
    durable: Option<DurableStore>,
    config: TimerConfig,
    notifier: Option<Box<dyn Notify>>,
}

impl TimerService {
    /// Open against the default data directory, loading configuration
    /// (or its defaults) from the config store.
    pub fn open() -> Result<Self> {
        let config = match Config::load() {
            Ok(cfg) => cfg.timer,
            Err(err) => {
                log::warn!("config unreadable, using defaults: {err}");
                TimerConfig::default()
            }
        };
        let durable = match DurableStore::open() {
            Ok(store) => Some(store),
            Err(err) => {
                log::warn!("durable store unavailable: {err}");
                None
            }
        };
        Ok(Self {
            shared: SharedStore::open()?,
            durable,
            config,
            notifier: None,
        })
    }

    /// Assemble from explicit parts (tests, embedding).
    pub fn new(shared: SharedStore, durable: Option<DurableStore>, config: TimerConfig) -> Self {
        Self {
            shared,
            durable,
            config,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notify>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Reconcile on resume: read both stores, roll the winner forward,
    /// write the result back with a fresh timestamp. Returns the
    /// trustworthy record plus a `PhaseCompleted` event if the stored
    /// phase had already expired (one catch-up transition at most).
    pub fn wake(&self) -> Result<(TimerRecord, Option<Event>)> {
        let now = Utc::now();
        let (record, completed) = self.read_reconciled(now);
        self.persist(&record);
        Ok((record, completed))
    }

    /// Foreground cadence: same contract as [`Self::wake`]. Ticks are
    /// never assumed to have fired while backgrounded.
    pub fn tick(&self) -> Result<Option<Event>> {
        Ok(self.wake()?.1)
    }

    /// Apply an inbound control command through the engine.
    pub fn apply(&self, command: Command) -> Result<Event> {
        let now = Utc::now();
        let (record, _) = self.read_reconciled(now);
        let (next, event) = match command {
            Command::Toggle => self.toggled(&record, now),
            Command::Skip => {
                let next = engine::start_next_phase(&record, now);
                let event = Event::TimerSkipped {
                    from_phase: record.phase,
                    to_phase: next.phase,
                    at: now,
                };
                (next, event)
            }
            Command::ResetRequested => {
                let next = engine::reset(&record, now);
                (next, Event::TimerReset { at: now })
            }
        };
        self.persist(&next);
        self.emit(&event);
        Ok(event)
    }

    /// Start the timer if idle; otherwise report the current state.
    pub fn start(&self) -> Result<Event> {
        let now = Utc::now();
        let (record, _) = self.read_reconciled(now);
        if record.run_state != RunState::Idle {
            self.persist(&record);
            return Ok(snapshot_of(&record, now));
        }
        let (next, event) = self.toggled(&record, now);
        self.persist(&next);
        self.emit(&event);
        Ok(event)
    }

    /// Pause if running; an incompatible run-state is a silent no-op
    /// answered with a snapshot.
    pub fn pause(&self) -> Result<Event> {
        self.run_state_change(engine::pause, |record, now| Event::TimerPaused {
            phase: record.phase,
            remaining_secs: record.remaining_secs,
            at: now,
        })
    }

    /// Resume if paused; same no-op contract as [`Self::pause`].
    pub fn resume(&self) -> Result<Event> {
        self.run_state_change(engine::resume, |record, now| Event::TimerResumed {
            phase: record.phase,
            remaining_secs: record.remaining_secs,
            at: now,
        })
    }

    /// Current state as a snapshot event, reconciled first.
    pub fn snapshot(&self) -> Result<Event> {
        let (record, _) = self.wake()?;
        Ok(snapshot_of(&record, Utc::now()))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn toggled(&self, record: &TimerRecord, now: DateTime<Utc>) -> (TimerRecord, Event) {
        let next = engine::toggle(record, now);
        let event = match (record.run_state, next.run_state) {
            (RunState::Running, RunState::Paused) => Event::TimerPaused {
                phase: next.phase,
                remaining_secs: next.remaining_secs,
                at: now,
            },
            (RunState::Paused, RunState::Running) => Event::TimerResumed {
                phase: next.phase,
                remaining_secs: next.remaining_secs,
                at: now,
            },
            _ => Event::PhaseStarted {
                phase: next.phase,
                duration_secs: next.total_secs(),
                completed_work_sessions: next.completed_work_sessions,
                at: now,
            },
        };
        (next, event)
    }

    fn run_state_change(
        &self,
        op: fn(&TimerRecord, DateTime<Utc>) -> TimerRecord,
        event_of: fn(&TimerRecord, DateTime<Utc>) -> Event,
    ) -> Result<Event> {
        let now = Utc::now();
        let (record, _) = self.read_reconciled(now);
        let next = op(&record, now);
        if next.run_state == record.run_state {
            // Invalid transition: silent no-op. The reconciled record
            // is still written back, so a catch-up transition observed
            // during the read reaches the other surfaces exactly once.
            self.persist(&record);
            return Ok(snapshot_of(&record, now));
        }
        let event = event_of(&next, now);
        self.persist(&next);
        self.emit(&event);
        Ok(event)
    }

    /// Read both stores, degrade on failure, reconcile, and fall back
    /// to a fresh default record when neither has data. A catch-up
    /// transition is notified here, so it is never lost even when the
    /// read happens on behalf of an inbound command.
    fn read_reconciled(&self, now: DateTime<Utc>) -> (TimerRecord, Option<Event>) {
        let shared = match self.shared.load() {
            Ok(found) => found,
            Err(err) => {
                log::warn!("shared store unreadable, degrading: {err}");
                None
            }
        };
        let durable = self.durable.as_ref().and_then(|store| match store.load() {
            Ok(found) => found,
            Err(err) => {
                log::warn!("durable store unreadable: {err}");
                None
            }
        });
        match reconcile::reconcile(shared, durable, now) {
            Some(out) => {
                let mut record = out.record;
                record.last_update = now;
                let completed = out.completed.map(|phase| Event::PhaseCompleted {
                    phase,
                    next_phase: record.phase,
                    completed_work_sessions: record.completed_work_sessions,
                    at: now,
                });
                if let Some(event) = &completed {
                    self.emit(event);
                }
                (record, completed)
            }
            None => (TimerRecord::fresh(self.config, now), None),
        }
    }

    /// Write the record to both stores. Failures are logged and
    /// swallowed; sync resumes whenever the store comes back.
    fn persist(&self, record: &TimerRecord) {
        if let Err(err) = self.shared.save(record) {
            log::warn!("shared store write failed: {err}");
        }
        if let Some(durable) = &self.durable {
            if let Err(err) = durable.save(record) {
                log::warn!("durable store write failed: {err}");
            }
        }
    }

    fn emit(&self, event: &Event) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(event);
        }
    }
}

fn snapshot_of(record: &TimerRecord, now: DateTime<Utc>) -> Event {
    Event::StateSnapshot {
        phase: record.phase,
        run_state: record.run_state,
        remaining_secs: record.remaining_secs,
        total_secs: record.total_secs(),
        completed_work_sessions: record.completed_work_sessions,
        at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Phase;
    use tempfile::tempdir;

    fn service_at(dir: &std::path::Path) -> TimerService {
        let shared = SharedStore::from_path(dir.join("shared_state.json"));
        let durable = DurableStore::open_memory().unwrap();
        TimerService::new(shared, Some(durable), TimerConfig::default())
    }

    #[test]
    fn command_wire_names_are_stable() {
        assert_eq!(serde_json::to_string(&Command::Toggle).unwrap(), r#""toggle""#);
        assert_eq!(serde_json::to_string(&Command::Skip).unwrap(), r#""skip""#);
        assert_eq!(
            serde_json::to_string(&Command::ResetRequested).unwrap(),
            r#""reset_requested""#
        );
        let cmd: Command = serde_json::from_str(r#""toggle""#).unwrap();
        assert_eq!(cmd, Command::Toggle);
    }

    #[test]
    fn wake_creates_fresh_state() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());
        let (record, completed) = service.wake().unwrap();
        assert_eq!(record.run_state, RunState::Idle);
        assert_eq!(record.phase, Phase::WarmUp);
        assert!(completed.is_none());
        // The reconciled record is persisted for other processes.
        assert!(service.shared.load().unwrap().is_some());
    }

    #[test]
    fn toggle_starts_then_pauses_then_resumes() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());

        let started = service.apply(Command::Toggle).unwrap();
        assert!(matches!(started, Event::PhaseStarted { .. }));

        let paused = service.apply(Command::Toggle).unwrap();
        assert!(matches!(paused, Event::TimerPaused { .. }));

        let resumed = service.apply(Command::Toggle).unwrap();
        assert!(matches!(resumed, Event::TimerResumed { .. }));
    }

    #[test]
    fn toggle_pair_restores_run_state() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());
        service.apply(Command::Toggle).unwrap();
        let (before, _) = service.wake().unwrap();

        service.apply(Command::Toggle).unwrap();
        service.apply(Command::Toggle).unwrap();
        let (after, _) = service.wake().unwrap();
        assert_eq!(after.run_state, before.run_state);
    }

    #[test]
    fn skip_advances_through_engine() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());
        service.apply(Command::Toggle).unwrap(); // WarmUp running.

        let event = service.apply(Command::Skip).unwrap();
        match event {
            Event::TimerSkipped {
                from_phase,
                to_phase,
                ..
            } => {
                assert_eq!(from_phase, Phase::WarmUp);
                assert_eq!(to_phase, Phase::Work);
            }
            other => panic!("expected TimerSkipped, got {other:?}"),
        }
        let (record, _) = service.wake().unwrap();
        assert_eq!(record.phase, Phase::Work);
        assert_eq!(record.run_state, RunState::Running);
    }

    #[test]
    fn reset_restores_defaults() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());
        service.apply(Command::Toggle).unwrap();
        service.apply(Command::Skip).unwrap();
        service.apply(Command::Skip).unwrap();

        let event = service.apply(Command::ResetRequested).unwrap();
        assert!(matches!(event, Event::TimerReset { .. }));
        let (record, _) = service.wake().unwrap();
        assert_eq!(record.run_state, RunState::Idle);
        assert_eq!(record.completed_work_sessions, 0);
        assert_eq!(record.phase, Phase::WarmUp);
    }

    #[test]
    fn pause_while_idle_is_a_silent_no_op() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());
        let event = service.pause().unwrap();
        assert!(matches!(event, Event::StateSnapshot { .. }));
        let (record, _) = service.wake().unwrap();
        assert_eq!(record.run_state, RunState::Idle);
    }

    #[test]
    fn resume_while_running_is_a_silent_no_op() {
        let dir = tempdir().unwrap();
        let service = service_at(dir.path());
        service.apply(Command::Toggle).unwrap();
        let event = service.resume().unwrap();
        assert!(matches!(event, Event::StateSnapshot { .. }));
    }

    #[test]
    fn command_from_second_surface_lands_in_shared_store() {
        // Two services on one shared path stand in for the primary
        // process and an external control surface. The durable stores
        // are process-local and deliberately not shared.
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let primary = TimerService::new(
            SharedStore::from_path(path.clone()),
            Some(DurableStore::open_memory().unwrap()),
            TimerConfig::default(),
        );
        let surface = TimerService::new(
            SharedStore::from_path(path),
            None,
            TimerConfig::default(),
        );

        primary.apply(Command::Toggle).unwrap();
        surface.apply(Command::Toggle).unwrap(); // Pause from elsewhere.

        let (record, _) = primary.wake().unwrap();
        assert_eq!(record.run_state, RunState::Paused);
    }

    #[test]
    fn shared_truth_beats_stale_durable_copy() {
        // The primary's durable store still says Running, but another
        // surface paused via the shared store; the pause must win.
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let durable = DurableStore::open_memory().unwrap();
        let mut rec = TimerRecord::fresh(TimerConfig::default(), Utc::now());
        rec.run_state = RunState::Running;
        rec.remaining_secs = 600;
        durable.save(&rec).unwrap();

        let mut paused = rec.clone();
        paused.run_state = RunState::Paused;
        SharedStore::from_path(path.clone()).save(&paused).unwrap();

        let service = TimerService::new(
            SharedStore::from_path(path),
            Some(durable),
            TimerConfig::default(),
        );
        let (record, _) = service.wake().unwrap();
        assert_eq!(record.run_state, RunState::Paused);
        assert_eq!(record.remaining_secs, 600);
    }

    #[test]
    fn wake_applies_one_catch_up_transition() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let t = Utc::now() - chrono::Duration::hours(2);
        let mut rec = TimerRecord::fresh(TimerConfig::default(), t);
        rec.phase = Phase::Work;
        rec.run_state = RunState::Running;
        rec.remaining_secs = 90;
        SharedStore::from_path(path.clone()).save(&rec).unwrap();

        let service = TimerService::new(
            SharedStore::from_path(path),
            None,
            TimerConfig::default(),
        );
        let (record, event) = service.wake().unwrap();
        assert_eq!(record.phase, Phase::ShortBreak);
        assert_eq!(record.remaining_secs, 5 * 60);
        match event {
            Some(Event::PhaseCompleted {
                phase, next_phase, ..
            }) => {
                assert_eq!(phase, Phase::Work);
                assert_eq!(next_phase, Phase::ShortBreak);
            }
            other => panic!("expected PhaseCompleted, got {other:?}"),
        }
    }

    #[test]
    fn tick_reports_a_completion_exactly_once() {
        // The foreground cadence is just reconciliation: an expired
        // phase yields one completion, and the follow-up tick finds
        // the advanced phase already persisted. Ticks on an idle
        // timer report nothing.
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let t = Utc::now() - chrono::Duration::minutes(30);
        let mut rec = TimerRecord::fresh(TimerConfig::default(), t);
        rec.phase = Phase::Work;
        rec.run_state = RunState::Running;
        rec.remaining_secs = 60;
        SharedStore::from_path(path.clone()).save(&rec).unwrap();

        let service = TimerService::new(
            SharedStore::from_path(path),
            None,
            TimerConfig::default(),
        );
        let first = service.tick().unwrap();
        assert!(matches!(first, Some(Event::PhaseCompleted { .. })));
        assert!(service.tick().unwrap().is_none());

        let fresh_dir = tempdir().unwrap();
        let idle = service_at(fresh_dir.path());
        assert!(idle.tick().unwrap().is_none());
    }

    #[test]
    fn no_op_command_still_persists_reconciled_state() {
        // An expired phase discovered while reading on behalf of a
        // no-op command must be written back: other surfaces keep
        // reading the shared store, and the boundary must not be
        // rediscovered (and re-notified) on every subsequent read.
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let t = Utc::now() - chrono::Duration::hours(2);
        let mut rec = TimerRecord::fresh(TimerConfig::default(), t);
        rec.phase = Phase::Work;
        rec.run_state = RunState::Running;
        rec.remaining_secs = 90;
        SharedStore::from_path(path.clone()).save(&rec).unwrap();

        let recorder = std::sync::Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
        let service = TimerService::new(
            SharedStore::from_path(path.clone()),
            None,
            TimerConfig::default(),
        )
        .with_notifier(Box::new(recorder.clone()));

        // Catch-up lands on ShortBreak/Running, so resume() is a no-op.
        let event = service.resume().unwrap();
        assert!(matches!(event, Event::StateSnapshot { .. }));

        let stored = SharedStore::from_path(path).load().unwrap().unwrap();
        assert_eq!(stored.phase, Phase::ShortBreak);

        // A second read finds the advanced phase already persisted.
        service.resume().unwrap();
        let completions = recorder
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|label| *label == "completed")
            .count();
        assert_eq!(completions, 1);
    }

    struct Recorder(std::sync::Mutex<Vec<String>>);

    impl Notify for std::sync::Arc<Recorder> {
        fn notify(&self, event: &Event) {
            let label = match event {
                Event::PhaseStarted { .. } => "started",
                Event::TimerPaused { .. } => "paused",
                Event::PhaseCompleted { .. } => "completed",
                _ => "other",
            };
            self.0.lock().unwrap().push(label.to_string());
        }
    }

    #[test]
    fn commands_notify_best_effort() {
        let dir = tempdir().unwrap();
        let recorder = std::sync::Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
        let service = service_at(dir.path()).with_notifier(Box::new(recorder.clone()));
        service.apply(Command::Toggle).unwrap();
        service.apply(Command::Toggle).unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["started", "paused"]);
    }
}
