//! Per-connection data context.
//!
//! # Responsibility
//! - Own the SQLite connection repositories operate on.
//! - Provide the timestamp source used for soft-delete stamps.
//! - Hold the stored-procedure catalog commands resolve against.
//!
//! # Invariants
//! - Everything in the context is `Send`, so a context can move behind a mutex.

use super::command::{Command, ProcedureCatalog};
use super::{DbError, DbResult};
use crate::config::CoreConfig;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Context shared by async repositories.
pub type SharedDataContext = Arc<Mutex<DataContext>>;

/// Source of "now" for soft-delete timestamps, in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_epoch_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Always returns the same instant. Used for deterministic tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch_ms(&self) -> i64 {
        self.0
    }
}

/// Connection plus the collaborators repositories need.
pub struct DataContext {
    conn: Connection,
    clock: Box<dyn Clock>,
    procedures: ProcedureCatalog,
}

impl DataContext {
    /// Wraps an opened (and migrated) connection with a system clock and an
    /// empty procedure catalog.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            clock: Box::new(SystemClock),
            procedures: ProcedureCatalog::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_procedures(mut self, procedures: ProcedureCatalog) -> Self {
        self.procedures = procedures;
        self
    }

    /// Applies host settings. A configured `default_schema` replaces the
    /// catalog's; registered procedures are kept.
    pub fn with_config(mut self, config: &CoreConfig) -> Self {
        if let Some(schema) = &config.default_schema {
            self.procedures =
                std::mem::take(&mut self.procedures).with_default_schema(schema.as_str());
        }
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn now_epoch_ms(&self) -> i64 {
        self.clock.now_epoch_ms()
    }

    pub fn procedures(&self) -> &ProcedureCatalog {
        &self.procedures
    }

    /// Resolves a registered procedure into a command.
    ///
    /// With `default_schema`, the catalog's default schema (if any) is
    /// prefixed to `name` before lookup.
    pub fn stored_procedure(&self, name: &str, default_schema: bool) -> DbResult<Command<'_>> {
        let qualified = self.procedures.qualified_name(name, default_schema);
        let statements = self
            .procedures
            .get(&qualified)
            .ok_or_else(|| DbError::UnknownProcedure(qualified.clone()))?;
        Ok(Command::new(&self.conn, qualified, statements.to_vec()))
    }

    /// Builds an ad hoc command from SQL text.
    pub fn sql_command(&self, sql: impl Into<String>) -> Command<'_> {
        let sql = sql.into();
        let statements = if sql.trim().is_empty() {
            Vec::new()
        } else {
            vec![sql]
        };
        Command::new(&self.conn, "<sql>".to_string(), statements)
    }

    pub fn into_shared(self) -> SharedDataContext {
        Arc::new(Mutex::new(self))
    }
}
