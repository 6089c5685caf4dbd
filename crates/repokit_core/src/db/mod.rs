//! SQLite bootstrap, data context and command execution.
//!
//! # Responsibility
//! - Open and configure SQLite connections for repositories.
//! - Apply caller-supplied schema migrations in deterministic order.
//! - Own the per-connection context (timestamp provider, procedure catalog).
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Statements are finalized before a command call returns, on every path.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod command;
pub mod context;
pub mod migrations;
mod open;

pub use command::{Command, MultiResults, ProcedureCatalog};
pub use context::{Clock, DataContext, FixedClock, SharedDataContext, SystemClock};
pub use migrations::Migration;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidMigrationOrder {
        previous: u32,
        next: u32,
    },
    /// Command has no statement text or was driven past its last result set.
    InvalidCommand(String),
    UnknownProcedure(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidMigrationOrder { previous, next } => write!(
                f,
                "migration versions must increase strictly; {next} follows {previous}"
            ),
            Self::InvalidCommand(message) => write!(f, "invalid command: {message}"),
            Self::UnknownProcedure(name) => write!(f, "stored procedure not found: {name}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::InvalidMigrationOrder { .. }
            | Self::InvalidCommand(_)
            | Self::UnknownProcedure(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
