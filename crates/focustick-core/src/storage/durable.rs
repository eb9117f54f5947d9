//! Process-local durable store.
//!
//! SQLite-backed key-value persistence of the encoded timer record and
//! its write timestamp. This is the intra-process fallback of last
//! resort; cross-process truth lives in [`super::shared`].

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::data_dir;
use crate::codec;
use crate::error::{Result, StoreError};
use crate::timer::TimerRecord;

const RECORD_KEY: &str = "timer_record";
const SAVED_AT_KEY: &str = "timer_saved_at";

/// SQLite database holding the last record this process wrote.
pub struct DurableStore {
    conn: Connection,
}

impl DurableStore {
    /// Open the database at `~/.config/focustick/focustick.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focustick.db");
        let conn = Connection::open(&path)
            .map_err(|source| StoreError::OpenFailed { path, source })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read the saved record, if any.
    ///
    /// All-or-nothing: a missing or undecodable record or timestamp
    /// yields `Ok(None)`, the same as no saved state.
    pub fn load(&self) -> Result<Option<TimerRecord>> {
        let Some(json) = self.kv_get(RECORD_KEY)? else {
            return Ok(None);
        };
        let Some(saved_at) = self.kv_get(SAVED_AT_KEY)? else {
            return Ok(None);
        };
        let Ok(saved_at) = saved_at.parse::<DateTime<Utc>>() else {
            log::warn!("durable store: unreadable timestamp, treating as no saved state");
            return Ok(None);
        };
        Ok(codec::decode(&json, saved_at))
    }

    /// Write the record and its timestamp.
    pub fn save(&self, record: &TimerRecord) -> Result<()> {
        let json = codec::encode(record)?;
        self.kv_set(RECORD_KEY, &json)?;
        self.kv_set(SAVED_AT_KEY, &record.last_update.to_rfc3339())?;
        Ok(())
    }
}
