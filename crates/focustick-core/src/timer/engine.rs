//! Phase engine: pure transition functions on [`TimerRecord`].
//!
//! No I/O and no clock reads -- the caller supplies `now`, which makes
//! every transition deterministic and testable in isolation. State is
//! mutated nowhere else; the owning layer ([`crate::control`]) applies
//! these functions and emits change events.
//!
//! Invalid transitions (pausing an idle timer, resuming a running one)
//! return the record unchanged rather than an error.

use chrono::{DateTime, Utc};

use super::phase::{Phase, RunState};
use super::record::TimerRecord;

/// Begin the warm-up phase, running.
///
/// A zero-minute warm-up is skipped uniformly: this routes straight to
/// Work with its full duration instead of entering a zero-second phase
/// that would force an immediate catch-up transition.
pub fn start_warmup(record: &TimerRecord, now: DateTime<Utc>) -> TimerRecord {
    let phase = if record.config.warm_up_min > 0 {
        Phase::WarmUp
    } else {
        Phase::Work
    };
    TimerRecord {
        phase,
        run_state: RunState::Running,
        remaining_secs: record.config.phase_secs(phase),
        last_update: now,
        ..record.clone()
    }
}

/// Advance to the next phase, running, with its full duration loaded.
///
/// Completing Work increments the session count; every
/// `sessions_until_long_break`-th completed session yields a LongBreak,
/// except that a setting of 0 disables long breaks entirely.
pub fn start_next_phase(record: &TimerRecord, now: DateTime<Utc>) -> TimerRecord {
    let cfg = &record.config;
    let mut sessions = record.completed_work_sessions;
    let next = match record.phase {
        Phase::WarmUp => Phase::Work,
        Phase::Work => {
            sessions = sessions.saturating_add(1);
            let due_long = cfg.sessions_until_long_break > 0
                && sessions % cfg.sessions_until_long_break == 0;
            if due_long {
                Phase::LongBreak
            } else {
                Phase::ShortBreak
            }
        }
        Phase::ShortBreak | Phase::LongBreak => Phase::Work,
    };
    TimerRecord {
        phase: next,
        run_state: RunState::Running,
        remaining_secs: cfg.phase_secs(next),
        completed_work_sessions: sessions,
        last_update: now,
        ..record.clone()
    }
}

/// Running -> Paused; anything else is a no-op.
pub fn pause(record: &TimerRecord, now: DateTime<Utc>) -> TimerRecord {
    match record.run_state {
        RunState::Running => TimerRecord {
            run_state: RunState::Paused,
            last_update: now,
            ..record.clone()
        },
        _ => record.clone(),
    }
}

/// Paused -> Running; anything else is a no-op.
pub fn resume(record: &TimerRecord, now: DateTime<Utc>) -> TimerRecord {
    match record.run_state {
        RunState::Paused => TimerRecord {
            run_state: RunState::Running,
            last_update: now,
            ..record.clone()
        },
        _ => record.clone(),
    }
}

/// Pause if running, resume if paused, start the loaded phase if idle.
pub fn toggle(record: &TimerRecord, now: DateTime<Utc>) -> TimerRecord {
    match record.run_state {
        RunState::Running => pause(record, now),
        RunState::Paused => resume(record, now),
        RunState::Idle => TimerRecord {
            run_state: RunState::Running,
            last_update: now,
            ..record.clone()
        },
    }
}

/// Back to idle with zero completed sessions and the opening phase
/// loaded at full duration (WarmUp, or Work when warm-up is zero).
pub fn reset(record: &TimerRecord, now: DateTime<Utc>) -> TimerRecord {
    TimerRecord::fresh(record.config, now)
}
