//! Durable key-value medium behind both stores.
//!
//! # Responsibility
//! - Define the `get/set/remove` contract the stores persist through.
//! - Provide SQLite-backed and in-memory implementations.
//! - Encode/decode JSON records, treating absent or malformed records as empty.
//!
//! # Invariants
//! - `set` overwrites the whole record; there are no partial writes.
//! - A malformed record is never propagated as an error on read.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the key-value medium.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection is not migrated to the schema this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Record could not be serialized before writing.
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "key-value storage requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Encode { key, source } => {
                write!(f, "failed to encode record `{key}`: {source}")
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::Encode { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Named-record storage, the local stand-in for browser local storage.
pub trait KeyValueStore {
    /// Loads one record. `None` means the key was never written or was removed.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Writes one record, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removes one record. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// SQLite-backed key-value store over the `kv_records` table.
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> StorageResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(StorageError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_records WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv_records (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv_records WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local key-value store. Nothing survives the value being dropped.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    records: RefCell<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.records.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.records
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.records.borrow_mut().remove(key);
        Ok(())
    }
}

/// Loads and decodes one JSON record.
///
/// Absent and malformed records both decode to `T::default()`; the latter
/// is logged at `warn`.
pub fn load_json_record<S, T>(store: &S, key: &str) -> StorageResult<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!(
                "event=record_load module=storage status=recovered key={key} bytes={} error={err}",
                raw.len()
            );
            Ok(T::default())
        }
    }
}

/// Encodes `value` as JSON and writes it under `key`.
pub fn save_json_record<S, T>(store: &S, key: &str, value: &T) -> StorageResult<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &encoded)
}
