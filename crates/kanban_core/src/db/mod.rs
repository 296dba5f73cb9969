//! SQLite bootstrap for the `kv_records` database.
//!
//! # Responsibility
//! - Open file-backed or in-memory SQLite connections.
//! - Bring the `kv_records` table up to the schema this build reads.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - A database written by a newer build is rejected, never downgraded.
//! - A failed migration step rolls back and names the step's version.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the key-value database.
#[derive(Debug)]
pub enum DbError {
    /// Connection-level SQLite failure outside a migration step.
    Sqlite(rusqlite::Error),
    /// One migration step failed; the whole batch was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// `user_version` is ahead of every migration this build ships.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "kv_records database error: {err}"),
            Self::Migration { version, source } => {
                write!(f, "kv_records migration {version} failed: {source}")
            }
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "kv_records schema {found} was written by a newer build (this build reads up to {supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
