//! Persisted habit slot contracts and SQLite implementation.
//!
//! # Responsibility
//! - Keep one serialized `HabitRecord` alive across process restarts.
//! - Hide slot encoding (JSON under a fixed key) from the session layer.
//!
//! # Invariants
//! - Write paths must call `HabitRecord::validate()` before SQL mutations.
//! - Read paths treat undecodable or invalid content as absent and clear it,
//!   so a corrupt slot is never retried.
//! - Only storage transport failures surface as errors from `load`.

use crate::db::DbError;
use crate::model::habit::{HabitRecord, HabitValidationError};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed slot key holding the active habit.
pub const HABIT_SLOT_KEY: &str = "habit_mantra_data";

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error for the habit slot.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Validation(HabitValidationError),
    Encode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode habit record: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<HabitValidationError> for StoreError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Storage contract for the single active habit.
pub trait HabitStore {
    /// Returns the stored habit, or `None` when absent or unreadable.
    fn load(&self) -> StoreResult<Option<HabitRecord>>;
    /// Replaces the stored habit.
    fn save(&self, habit: &HabitRecord) -> StoreResult<()>;
    /// Removes the stored habit. Clearing an empty slot succeeds.
    fn clear(&self) -> StoreResult<()>;
}

/// Slot store backed by the `kv_slots` SQLite table.
pub struct SqliteHabitStore {
    conn: Connection,
}

impl SqliteHabitStore {
    /// Wraps a connection returned by `db::open_db` or `db::open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reads the raw slot text without decoding it.
    pub fn read_raw(&self) -> StoreResult<Option<String>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM kv_slots WHERE key = ?1;",
                [HABIT_SLOT_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }

    /// Upserts already-validated slot text; only `save` reaches this.
    fn write_raw(&self, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_slots (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![HABIT_SLOT_KEY, value],
        )?;
        Ok(())
    }
}

impl HabitStore for SqliteHabitStore {
    fn load(&self) -> StoreResult<Option<HabitRecord>> {
        let Some(raw) = self.read_raw()? else {
            return Ok(None);
        };

        match decode_habit(&raw) {
            Ok(habit) => Ok(Some(habit)),
            Err(reason) => {
                warn!(
                    "event=habit_load module=repo status=discarded reason={reason} bytes={}",
                    raw.len()
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn save(&self, habit: &HabitRecord) -> StoreResult<()> {
        habit.validate()?;
        let encoded = serde_json::to_string(habit).map_err(StoreError::Encode)?;
        self.write_raw(&encoded)?;
        info!(
            "event=habit_save module=repo status=ok check_ins={}",
            habit.check_ins
        );
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM kv_slots WHERE key = ?1;", [HABIT_SLOT_KEY])?;
        info!("event=habit_clear module=repo status=ok removed={removed}");
        Ok(())
    }
}

fn decode_habit(raw: &str) -> Result<HabitRecord, &'static str> {
    let habit: HabitRecord = serde_json::from_str(raw).map_err(|_| "invalid_shape")?;
    habit.validate().map_err(|_| "invalid_record")?;
    Ok(habit)
}

#[cfg(test)]
mod tests {
    use super::decode_habit;

    #[test]
    fn decode_rejects_missing_fields() {
        let raw = r#"{"id":"11111111-2222-4333-8444-555555555555","originalGoal":"run"}"#;
        assert_eq!(decode_habit(raw).unwrap_err(), "invalid_shape");
    }

    #[test]
    fn decode_rejects_blank_mantra() {
        let raw = r#"{
            "id":"11111111-2222-4333-8444-555555555555",
            "originalGoal":"run",
            "mantra":{"identity":"","benefit":"b","emotion":"e"},
            "createdAt":1,
            "checkIns":0,
            "lastCheckInDate":null
        }"#;
        assert_eq!(decode_habit(raw).unwrap_err(), "invalid_record");
    }
}
