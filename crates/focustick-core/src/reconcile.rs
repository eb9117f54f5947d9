//! Reconciliation: derive a trustworthy current record from stale
//! stored snapshots plus elapsed wall-clock time.
//!
//! Every reader runs this on resume, whether or not its foreground
//! tick kept firing. Remaining time is computed analytically from the
//! write timestamp; no live counting thread is trusted across a
//! suspension, and a surface's self-driving countdown is a rendering
//! projection, never a data source.

use chrono::{DateTime, Utc};

use crate::timer::{engine, Phase, RunState, TimerRecord};

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub record: TimerRecord,
    /// Set when the stored phase had already expired and a single
    /// catch-up transition was applied.
    pub completed: Option<Phase>,
}

/// Merge the two store snapshots and roll the winner forward to `now`.
///
/// The shared store wins whenever it has data: any process, including
/// a background control surface, may have mutated it most recently.
/// The durable snapshot is only a fallback for an unreadable shared
/// namespace. Returns `None` when neither store has data.
pub fn reconcile(
    shared: Option<TimerRecord>,
    durable: Option<TimerRecord>,
    now: DateTime<Utc>,
) -> Option<Reconciled> {
    let chosen = shared.or(durable)?;
    Some(apply_elapsed(&chosen, now))
}

/// Roll a record forward by the wall-clock time since its last write.
///
/// Time only passes while Running. If the remaining time is spent,
/// exactly one catch-up transition is applied and the overflow is
/// discarded: the next phase starts with its full duration no matter
/// how long the suspension lasted. Longer gaps resolve one phase per
/// reconciliation pass, which bounds the catch-up cost.
pub fn apply_elapsed(record: &TimerRecord, now: DateTime<Utc>) -> Reconciled {
    if record.run_state != RunState::Running {
        // Paused and idle timers do not decay.
        return Reconciled {
            record: record.clone(),
            completed: None,
        };
    }

    let elapsed = (now - record.last_update).num_seconds().max(0) as u64;
    let remaining = record.remaining_secs.saturating_sub(elapsed);
    if remaining == 0 {
        let advanced = engine::start_next_phase(record, now);
        return Reconciled {
            completed: Some(record.phase),
            record: advanced,
        };
    }

    let mut record = record.clone();
    record.remaining_secs = remaining;
    record.last_update = now;
    Reconciled {
        record,
        completed: None,
    }
}
