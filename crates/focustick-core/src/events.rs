use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, RunState};

/// Every applied timer operation produces an Event.
///
/// Collaborators (playback control, notification scheduling, session
/// statistics) subscribe to these; the core never calls them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PhaseStarted {
        phase: Phase,
        duration_secs: u64,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from_phase: Phase,
        to_phase: Phase,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// A phase ran out of time, discovered either by a foreground tick
    /// or by reconciliation after a suspension (catch-up transition).
    PhaseCompleted {
        phase: Phase,
        next_phase: Phase,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        run_state: RunState,
        remaining_secs: u64,
        total_secs: u64,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
}
