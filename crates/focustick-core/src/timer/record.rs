use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::{Phase, RunState, TimerConfig};

/// The canonical timer record: the single authoritative snapshot of
/// phase, run-state, remaining time, session count and configuration.
///
/// There is no long-lived in-memory owner across process boundaries.
/// Each process holds a transient copy; the shared store is the
/// cross-process source of truth, and every reader runs
/// [`crate::reconcile`] before trusting a stale copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub phase: Phase,
    pub run_state: RunState,
    pub remaining_secs: u64,
    pub completed_work_sessions: u32,
    pub config: TimerConfig,
    /// When this record was last written. Reconciliation derives
    /// elapsed wall-clock time from this anchor.
    pub last_update: DateTime<Utc>,
}

impl TimerRecord {
    /// A fresh idle record for the given configuration.
    ///
    /// Loads WarmUp with its full duration, or Work when the warm-up
    /// duration is zero (zero-minute warm-ups are skipped on every
    /// path, uniformly).
    pub fn fresh(config: TimerConfig, now: DateTime<Utc>) -> Self {
        let phase = if config.warm_up_min > 0 {
            Phase::WarmUp
        } else {
            Phase::Work
        };
        Self {
            phase,
            run_state: RunState::Idle,
            remaining_secs: config.phase_secs(phase),
            completed_work_sessions: 0,
            config,
            last_update: now,
        }
    }

    /// Full duration of the current phase in seconds.
    pub fn total_secs(&self) -> u64 {
        self.config.phase_secs(self.phase)
    }
}
