//! Cross-process shared store.
//!
//! A single JSON snapshot file visible to every cooperating process:
//! the primary app, the background display surface and any external
//! control surface. Writes are whole-snapshot replacements via a temp
//! file and atomic rename, so readers never observe a partial record.
//! There are no locks; last write wins on timestamp.
//!
//! The snapshot duplicates the configuration durations at the top
//! level for readers that have no access to the preference store.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::data_dir;
use crate::codec;
use crate::error::{Result, StoreError};
use crate::timer::TimerRecord;

/// Handle to the shared snapshot file.
pub struct SharedStore {
    path: PathBuf,
}

impl SharedStore {
    /// Open the store at `~/.config/focustick/shared_state.json`.
    pub fn open() -> Result<Self> {
        Ok(Self::from_path(data_dir()?.join("shared_state.json")))
    }

    /// Use an explicit path (tests, alternate namespaces).
    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the latest snapshot.
    ///
    /// Absent or undecodable snapshots read as `Ok(None)`; an
    /// inaccessible namespace is `StoreError::Unavailable`, which
    /// callers treat as degraded single-process mode.
    pub fn load(&self) -> Result<Option<TimerRecord>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Unavailable(err.to_string())),
        };
        let Ok(snapshot) = serde_json::from_str::<serde_json::Value>(&data) else {
            log::warn!("shared store: corrupt snapshot, treating as no saved state");
            return Ok(None);
        };
        let Some(saved_at) = snapshot
            .get("saved_at")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        else {
            return Ok(None);
        };
        let Some(record) = snapshot.get("record") else {
            return Ok(None);
        };
        Ok(codec::decode(&record.to_string(), saved_at))
    }

    /// Replace the snapshot with a complete new one.
    ///
    /// Written to a temp file first, then renamed over the old
    /// snapshot, so concurrent readers see either the old or the new
    /// record, never an interleaving.
    pub fn save(&self, record: &TimerRecord) -> Result<()> {
        let encoded = codec::encode_value(record)?;
        let cfg = &record.config;
        let snapshot = json!({
            "record": encoded,
            "saved_at": record.last_update.to_rfc3339(),
            "work_min": cfg.work_min,
            "short_break_min": cfg.short_break_min,
            "long_break_min": cfg.long_break_min,
            "warm_up_min": cfg.warm_up_min,
            "sessions_until_long_break": cfg.sessions_until_long_break,
        });
        let data = serde_json::to_string_pretty(&snapshot)?;

        // Per-process temp name: two surfaces writing at once must not
        // share a staging file, or one rename could promote the
        // other's half-written bytes.
        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, &data)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let tmp_name = format!(
            ".{}.tmp-{}",
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("shared_state"),
            std::process::id()
        );
        self.path
            .parent()
            .map(|p| p.join(&tmp_name))
            .unwrap_or_else(|| PathBuf::from(&tmp_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, RunState, TimerConfig};
    use tempfile::tempdir;

    fn sample() -> TimerRecord {
        let mut rec = TimerRecord::fresh(TimerConfig::default(), Utc::now());
        rec.phase = Phase::Work;
        rec.run_state = RunState::Running;
        rec.remaining_secs = 540;
        rec
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = SharedStore::from_path(dir.path().join("shared_state.json"));
        assert!(store.load().unwrap().is_none());

        let rec = sample();
        store.save(&rec).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.phase, Phase::Work);
        assert_eq!(loaded.remaining_secs, 540);
        assert_eq!(loaded.run_state, RunState::Running);
    }

    #[test]
    fn second_handle_sees_the_write() {
        // Two handles on the same path stand in for two processes.
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let writer = SharedStore::from_path(path.clone());
        let reader = SharedStore::from_path(path);

        writer.save(&sample()).unwrap();
        assert!(reader.load().unwrap().is_some());
    }

    #[test]
    fn snapshot_duplicates_config_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let store = SharedStore::from_path(path.clone());
        store.save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["work_min"], 25);
        assert_eq!(raw["short_break_min"], 5);
        assert_eq!(raw["long_break_min"], 15);
        assert_eq!(raw["sessions_until_long_break"], 4);
    }

    #[test]
    fn corrupt_snapshot_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SharedStore::from_path(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn snapshot_without_timestamp_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        std::fs::write(&path, r#"{"record":{}}"#).unwrap();
        let store = SharedStore::from_path(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared_state.json");
        let store = SharedStore::from_path(path.clone());
        store.save(&sample()).unwrap();
        // Only the snapshot itself remains in the directory.
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["shared_state.json"]);
    }

    #[test]
    fn staging_file_is_unique_per_process() {
        // Another process staging its own write must never collide
        // with ours, so the temp name carries the writer's pid.
        let store = SharedStore::from_path(PathBuf::from("/data/shared_state.json"));
        let tmp = store.tmp_path();
        assert_eq!(tmp.parent(), Some(std::path::Path::new("/data")));
        let name = tmp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".shared_state.json.tmp-"));
        assert!(name.ends_with(&std::process::id().to_string()));
    }
}
