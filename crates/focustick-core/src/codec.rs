//! Versioned codec for the canonical timer record.
//!
//! Two on-disk shapes are in circulation: the current one carries
//! `run_state` as a three-way enumeration, the legacy one only the
//! `was_running`/`was_paused` booleans. Encoding always writes both --
//! older readers sharing a store keep working, newer readers prefer the
//! enumeration. If the schema evolves again, repeat the pattern (write
//! old + new, read either) rather than a one-shot migration.
//!
//! Decoding is all-or-nothing: any failure means "no saved state", and
//! callers fall back to a fresh default record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::timer::{Phase, RunState, TimerConfig, TimerRecord};

/// Wire shape of a persisted record. The write timestamp travels
/// separately (each store keeps its own), so it is not part of this
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub phase: Phase,
    /// Current-format run state. Absent or unparseable in legacy data.
    #[serde(default, deserialize_with = "lenient_run_state")]
    pub run_state: Option<RunState>,
    /// Legacy compatibility flags, always written on encode.
    #[serde(default, alias = "wasRunning")]
    pub was_running: bool,
    #[serde(default, alias = "wasPaused")]
    pub was_paused: bool,
    pub remaining_secs: u64,
    #[serde(default)]
    pub completed_work_sessions: u32,
    /// Legacy snapshots predate the embedded config.
    #[serde(default)]
    pub config: Option<TimerConfig>,
}

/// Parse `run_state` if it is present and valid, else `None` so the
/// decoder falls through to the legacy booleans. A plain `Option`
/// would reject the whole payload on an unknown value.
fn lenient_run_state<'de, D>(deserializer: D) -> Result<Option<RunState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl StoredRecord {
    fn run_state(&self) -> RunState {
        if let Some(state) = self.run_state {
            return state;
        }
        // Legacy derivation: paused wins regardless of the running flag.
        if self.was_paused {
            RunState::Paused
        } else if self.was_running {
            RunState::Running
        } else {
            RunState::Idle
        }
    }
}

/// The wire shape as a JSON value, for embedding in a larger snapshot.
pub fn encode_value(record: &TimerRecord) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(stored_shape(record))
}

/// Encode a record for persistence, dual-writing the run state.
pub fn encode(record: &TimerRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(&stored_shape(record))
}

fn stored_shape(record: &TimerRecord) -> StoredRecord {
    StoredRecord {
        phase: record.phase,
        run_state: Some(record.run_state),
        was_running: record.run_state == RunState::Running,
        was_paused: record.run_state == RunState::Paused,
        remaining_secs: record.remaining_secs,
        completed_work_sessions: record.completed_work_sessions,
        config: Some(record.config),
    }
}

/// Decode a persisted record, stamping it with the store's write
/// timestamp. Returns `None` for anything undecodable -- legacy decode
/// failures are indistinguishable from "no saved state".
pub fn decode(json: &str, saved_at: DateTime<Utc>) -> Option<TimerRecord> {
    let stored: StoredRecord = serde_json::from_str(json).ok()?;
    let run_state = stored.run_state();
    Some(TimerRecord {
        phase: stored.phase,
        run_state,
        remaining_secs: stored.remaining_secs,
        completed_work_sessions: stored.completed_work_sessions,
        config: stored.config.unwrap_or_default(),
        last_update: saved_at,
    })
}
