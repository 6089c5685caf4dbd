//! Stored-procedure style commands over SQLite.
//!
//! SQLite has no server-side procedures, so a procedure here is a named,
//! ordered batch of SQL statements kept in a [`ProcedureCatalog`]. Each
//! statement that returns rows is one result set.
//!
//! # Invariants
//! - Each statement binds only the named parameters it references.
//! - Prepared statements are dropped before `call`/`call_multi` return.
//! - Every statement of a procedure runs exactly once per call, in order.

use super::{DbError, DbResult};
use crate::config::CoreConfig;
use crate::model::entity::FromRow;
use crate::model::value::FieldValue;
use log::{debug, error};
use rusqlite::types::FromSql;
use rusqlite::{Connection, Statement};
use std::collections::HashMap;
use std::time::Instant;

/// Named SQL batches addressable as stored procedures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureCatalog {
    default_schema: Option<String>,
    procedures: HashMap<String, Vec<String>>,
}

impl ProcedureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty catalog using the host's configured default schema.
    pub fn from_config(config: &CoreConfig) -> Self {
        match &config.default_schema {
            Some(schema) => Self::new().with_default_schema(schema.as_str()),
            None => Self::new(),
        }
    }

    /// Sets the schema prefixed to names resolved with `default_schema = true`.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.default_schema = if schema.trim().is_empty() {
            None
        } else {
            Some(schema)
        };
        self
    }

    /// Registers `statements` under their fully qualified `name`.
    pub fn register<I, S>(&mut self, name: impl Into<String>, statements: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.procedures.insert(
            name.into(),
            statements.into_iter().map(Into::into).collect(),
        );
    }

    pub fn with_procedure<I, S>(mut self, name: impl Into<String>, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(name, statements);
        self
    }

    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    pub fn qualified_name(&self, name: &str, default_schema: bool) -> String {
        match (&self.default_schema, default_schema) {
            (Some(schema), true) => format!("{schema}.{name}"),
            _ => name.to_string(),
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&[String]> {
        self.procedures.get(qualified_name).map(Vec::as_slice)
    }
}

/// A resolved command with bound parameters, ready to call.
pub struct Command<'conn> {
    conn: &'conn Connection,
    name: String,
    statements: Vec<String>,
    parameters: Vec<(String, FieldValue)>,
}

impl<'conn> Command<'conn> {
    pub(crate) fn new(conn: &'conn Connection, name: String, statements: Vec<String>) -> Self {
        Self {
            conn,
            name,
            statements,
            parameters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binds `value` to `:name` (the `:` prefix is added when missing).
    ///
    /// Rebinding a name replaces the earlier value.
    pub fn with_parameter(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        let name = normalize_parameter_name(name);
        let value = value.into();
        match self.parameters.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.parameters.push((name, value)),
        }
        self
    }

    pub fn with_null_parameter(self, name: &str) -> Self {
        self.with_parameter(name, FieldValue::Null)
    }

    /// Runs the command and maps the first result set.
    pub fn call<R: FromRow>(self) -> DbResult<Vec<R>> {
        let mut rows = Vec::new();
        self.call_multi(|results| {
            rows = results.read_to_list()?;
            Ok(())
        })?;
        Ok(rows)
    }

    /// Runs the command and hands its result sets to `results`.
    ///
    /// Statements the callback does not read still run, in order, after it
    /// returns.
    pub fn call_multi<F>(self, results: F) -> DbResult<()>
    where
        F: FnOnce(&mut MultiResults<'_>) -> DbResult<()>,
    {
        if self.statements.is_empty() {
            return Err(DbError::InvalidCommand(format!(
                "command `{}` has no statement text",
                self.name
            )));
        }

        let started_at = Instant::now();
        let mut multi = MultiResults {
            conn: self.conn,
            statements: &self.statements,
            parameters: &self.parameters,
            index: 0,
            executed: vec![false; self.statements.len()],
        };

        let outcome = results(&mut multi).and_then(|()| multi.finish());
        match &outcome {
            Ok(()) => debug!(
                "event=command_call module=db status=ok name={} statements={} duration_ms={}",
                self.name,
                self.statements.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=command_call module=db status=error name={} duration_ms={} error={}",
                self.name,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        outcome
    }

    /// Runs every statement, discarding rows; returns the number of rows
    /// changed by the whole batch.
    pub fn execute(self) -> DbResult<usize> {
        let conn = self.conn;
        let before = total_changes(conn)?;
        self.call_multi(|_| Ok(()))?;
        let after = total_changes(conn)?;
        Ok(usize::try_from(after.saturating_sub(before)).unwrap_or(usize::MAX))
    }
}

/// Cursor over the result sets of one command call.
pub struct MultiResults<'a> {
    conn: &'a Connection,
    statements: &'a [String],
    parameters: &'a [(String, FieldValue)],
    index: usize,
    executed: Vec<bool>,
}

impl<'a> MultiResults<'a> {
    /// Maps every row of the current result set.
    ///
    /// Returns an empty list when the current set was already consumed.
    pub fn read_to_list<R: FromRow>(&mut self) -> DbResult<Vec<R>> {
        if self.take_current()? {
            return Ok(Vec::new());
        }
        let mut stmt = self.prepare_current()?;
        let mut rows = stmt.raw_query();
        let mut list = Vec::new();
        while let Some(row) = rows.next()? {
            list.push(R::from_row(row)?);
        }
        Ok(list)
    }

    /// Reads the first column of the first row of the current result set.
    ///
    /// `None` for empty sets, NULL values and already consumed sets.
    pub fn read_to_value<V: FromSql>(&mut self) -> DbResult<Option<V>> {
        if self.take_current()? {
            return Ok(None);
        }
        let mut stmt = self.prepare_current()?;
        let mut rows = stmt.raw_query();
        match rows.next()? {
            Some(row) => Ok(row.get::<_, Option<V>>(0)?),
            None => Ok(None),
        }
    }

    /// Advances to the next result set, running the current one first if it
    /// was never read. Returns `false` when no sets remain.
    pub fn next_result(&mut self) -> DbResult<bool> {
        if self.index >= self.statements.len() {
            return Ok(false);
        }
        self.run_current()?;
        self.index += 1;
        Ok(self.index < self.statements.len())
    }

    fn run_current(&mut self) -> DbResult<()> {
        if self.take_current()? {
            return Ok(());
        }
        let mut stmt = self.prepare_current()?;
        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
        Ok(())
    }

    fn finish(&mut self) -> DbResult<()> {
        while self.index < self.statements.len() {
            self.run_current()?;
            self.index += 1;
        }
        Ok(())
    }

    /// Marks the current set consumed and reports whether it already was.
    fn take_current(&mut self) -> DbResult<bool> {
        let slot = self.executed.get_mut(self.index).ok_or_else(|| {
            DbError::InvalidCommand("no more result sets to read".to_string())
        })?;
        Ok(std::mem::replace(slot, true))
    }

    fn prepare_current(&self) -> DbResult<Statement<'a>> {
        prepare_bound(self.conn, &self.statements[self.index], self.parameters)
    }
}

fn prepare_bound<'c>(
    conn: &'c Connection,
    sql: &str,
    parameters: &[(String, FieldValue)],
) -> DbResult<Statement<'c>> {
    let mut stmt = conn.prepare(sql)?;
    for (name, value) in parameters {
        if let Some(index) = stmt.parameter_index(name)? {
            stmt.raw_bind_parameter(index, value)?;
        }
    }
    Ok(stmt)
}

fn total_changes(conn: &Connection) -> DbResult<i64> {
    let changes = conn.query_row("SELECT total_changes();", [], |row| row.get::<_, i64>(0))?;
    Ok(changes)
}

fn normalize_parameter_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with([':', '@', '$']) {
        trimmed.to_string()
    } else {
        format!(":{trimmed}")
    }
}
