//! Generic repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, soft-delete filtering and paginated reads for any `Entity`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Reads hide soft-deleted rows unless `show_deleted` is set.
//! - Sort clauses are validated before any SQL runs.
//! - Page totals are counted before the `LIMIT/OFFSET` window is applied.

use super::filter::Filter;
use crate::db::{Command, DataContext, DbError};
use crate::mapping::MappingTable;
use crate::model::entity::{resolve_field, Entity, Shape};
use crate::model::value::FieldValue;
use crate::query::paginated::{to_paginated_list, PageRequest, PaginatedList};
use crate::query::sort::{
    apply_sort, order_by_sql, sort_keys, validate_paths, OrderKey, SortDirection,
};
use crate::query::{is_sql_identifier, QueryError};
use log::{debug, info};
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Query(QueryError),
    NotFound {
        table: &'static str,
        key: String,
    },
    /// Filter matched nothing where one row was required.
    NoMatch {
        table: &'static str,
    },
    /// Filter matched several rows where at most one was expected.
    NotUnique {
        table: &'static str,
        count: usize,
    },
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
    /// Async wrapper failed outside the repository call itself.
    Background(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::NotFound { table, key } => write!(f, "{table} row not found: {key}"),
            Self::NoMatch { table } => write!(f, "no {table} row matches the filter"),
            Self::NotUnique { table, count } => {
                write!(f, "expected at most one {table} row, found {count}")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "column `{column}` is not mapped on table `{table}`")
            }
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column missing: {table}.{column}")
            }
            Self::InvalidData(message) => write!(f, "invalid entity data: {message}"),
            Self::Background(message) => write!(f, "background task failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

/// Options for one paginated read.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub page: PageRequest,
    pub filter: Filter,
    /// Comma-separated sort clauses, translated through a mapping table.
    pub order_by: String,
    pub show_deleted: bool,
}

impl PageQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            page,
            filter: Filter::default(),
            order_by: String::new(),
            show_deleted: false,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    pub fn with_show_deleted(mut self, show_deleted: bool) -> Self {
        self.show_deleted = show_deleted;
        self
    }
}

/// Repository interface for entity CRUD operations.
pub trait Repository<T: Entity> {
    fn get_by_key(&self, key: &FieldValue, show_deleted: bool) -> RepoResult<Option<T>>;
    /// Returns the only row matching `filter`; several matches are an error.
    fn get_single(&self, filter: &Filter, show_deleted: bool) -> RepoResult<Option<T>>;
    fn get_all(&self, filter: &Filter, show_deleted: bool) -> RepoResult<Vec<T>>;
    fn count(&self, filter: &Filter, show_deleted: bool) -> RepoResult<u64>;
    fn paginate(&self, query: &PageQuery, table: &MappingTable) -> RepoResult<PaginatedList<T>>;
    fn insert(&self, entity: &T) -> RepoResult<usize>;
    /// Inserts all entities in one transaction.
    fn insert_range(&self, entities: &[T]) -> RepoResult<usize>;
    fn update(&self, entity: &T) -> RepoResult<usize>;
    /// Soft-deletes (or, without a soft-delete column, removes) the entity's row.
    fn delete(&self, entity: &T) -> RepoResult<usize>;
    /// Deletes the single visible row matching `filter`.
    fn delete_where(&self, filter: &Filter) -> RepoResult<usize>;
}

/// SQLite-backed repository for one entity type.
pub struct SqliteRepository<'ctx, T> {
    ctx: &'ctx DataContext,
    _entity: PhantomData<fn() -> T>,
}

impl<'ctx, T: Entity> SqliteRepository<'ctx, T> {
    /// Constructs a repository after checking the entity's table and columns.
    pub fn try_new(ctx: &'ctx DataContext) -> RepoResult<Self> {
        ensure_entity_ready::<T>(ctx.connection())?;
        Ok(Self::new_unchecked(ctx))
    }

    pub(crate) fn new_unchecked(ctx: &'ctx DataContext) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }

    fn conn(&self) -> &'ctx Connection {
        self.ctx.connection()
    }

    /// Resolves a registered procedure for invocation.
    pub fn stored_procedure(&self, name: &str, default_schema: bool) -> RepoResult<Command<'ctx>> {
        Ok(self.ctx.stored_procedure(name, default_schema)?)
    }

    /// Projects visible rows through `selector`, then sorts and pages the
    /// projected values in memory.
    ///
    /// Sort paths resolve against the fields of `R`, not the entity.
    pub fn paginate_map<R, F>(
        &self,
        query: &PageQuery,
        table: &MappingTable,
        selector: F,
    ) -> RepoResult<PaginatedList<R>>
    where
        R: Shape,
        F: FnMut(T) -> R,
    {
        let keys = sort_keys(&query.order_by, table)?;
        validate_paths::<R>(&keys)?;

        let projected = self
            .get_all(&query.filter, query.show_deleted)?
            .into_iter()
            .map(selector)
            .collect::<Vec<_>>();
        let sorted = apply_sort(projected, &keys)?;
        Ok(to_paginated_list(sorted, query.page))
    }

    fn select_rows(
        &self,
        filter: &Filter,
        show_deleted: bool,
        tail: &str,
        extra_binds: Vec<FieldValue>,
    ) -> RepoResult<Vec<T>> {
        let started_at = Instant::now();
        let mut sql = format!("SELECT {} FROM {}", T::fields().join(", "), T::TABLE);
        let mut binds = Vec::new();
        push_where::<T>(&mut sql, &mut binds, filter, show_deleted)?;
        sql.push_str(tail);
        binds.extend(extra_binds);

        let mut stmt = self.conn().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds.iter()))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(T::from_row(row)?);
        }

        debug!(
            "event=repo_select module=repo status=ok table={} rows={} duration_ms={}",
            T::TABLE,
            entities.len(),
            started_at.elapsed().as_millis()
        );
        Ok(entities)
    }

    fn insert_with(&self, conn: &Connection, entity: &T) -> RepoResult<usize> {
        let columns = T::fields();
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            T::TABLE,
            columns.join(", "),
            placeholders
        );
        let values = entity_values(entity)?;
        Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
    }
}

impl<T: Entity> Repository<T> for SqliteRepository<'_, T> {
    fn get_by_key(&self, key: &FieldValue, show_deleted: bool) -> RepoResult<Option<T>> {
        let filter = Filter::new().eq(T::KEY_COLUMN, key.clone());
        let mut rows = self.select_rows(&filter, show_deleted, " LIMIT 1", Vec::new())?;
        Ok(rows.pop())
    }

    fn get_single(&self, filter: &Filter, show_deleted: bool) -> RepoResult<Option<T>> {
        // Two rows are enough to detect ambiguity.
        let mut rows = self.select_rows(filter, show_deleted, " LIMIT 2", Vec::new())?;
        if rows.len() > 1 {
            let count = usize::try_from(self.count(filter, show_deleted)?).unwrap_or(usize::MAX);
            return Err(RepoError::NotUnique {
                table: T::TABLE,
                count,
            });
        }
        Ok(rows.pop())
    }

    fn get_all(&self, filter: &Filter, show_deleted: bool) -> RepoResult<Vec<T>> {
        let tail = format!(" ORDER BY {} ASC", T::KEY_COLUMN);
        self.select_rows(filter, show_deleted, &tail, Vec::new())
    }

    fn count(&self, filter: &Filter, show_deleted: bool) -> RepoResult<u64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
        let mut binds = Vec::new();
        push_where::<T>(&mut sql, &mut binds, filter, show_deleted)?;

        let count: i64 =
            self.conn()
                .query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn paginate(&self, query: &PageQuery, table: &MappingTable) -> RepoResult<PaginatedList<T>> {
        let started_at = Instant::now();
        let keys = entity_order_keys::<T>(&query.order_by, table)?;

        let total_count = self.count(&query.filter, query.show_deleted)?;
        let tail = format!(" ORDER BY {} LIMIT ? OFFSET ?", order_by_sql(&keys));
        let window = vec![
            FieldValue::Integer(i64::try_from(query.page.limit()).unwrap_or(i64::MAX)),
            FieldValue::Integer(i64::try_from(query.page.offset()).unwrap_or(i64::MAX)),
        ];
        let items = self.select_rows(&query.filter, query.show_deleted, &tail, window)?;

        info!(
            "event=repo_paginate module=repo status=ok table={} page={} size={} total={} duration_ms={}",
            T::TABLE,
            query.page.page_number(),
            query.page.page_size(),
            total_count,
            started_at.elapsed().as_millis()
        );
        Ok(PaginatedList::new(items, query.page, total_count))
    }

    fn insert(&self, entity: &T) -> RepoResult<usize> {
        self.insert_with(self.conn(), entity)
    }

    fn insert_range(&self, entities: &[T]) -> RepoResult<usize> {
        let tx = self.conn().unchecked_transaction()?;
        let mut inserted = 0;
        for entity in entities {
            inserted += self.insert_with(&tx, entity)?;
        }
        tx.commit()?;

        info!(
            "event=repo_insert_range module=repo status=ok table={} rows={}",
            T::TABLE,
            inserted
        );
        Ok(inserted)
    }

    fn update(&self, entity: &T) -> RepoResult<usize> {
        let columns = T::fields()
            .iter()
            .copied()
            .filter(|column| *column != T::KEY_COLUMN)
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(RepoError::InvalidData(format!(
                "{} has no updatable columns",
                T::TYPE_NAME
            )));
        }

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{};",
            T::TABLE,
            assignments,
            T::KEY_COLUMN,
            columns.len() + 1
        );

        let mut values = columns
            .iter()
            .map(|column| field_of(entity, column))
            .collect::<RepoResult<Vec<_>>>()?;
        let key = entity.key();
        values.push(key.clone());

        let changed = self
            .conn()
            .execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(not_found::<T>(&key));
        }
        Ok(changed)
    }

    fn delete(&self, entity: &T) -> RepoResult<usize> {
        let key = entity.key();
        let changed = match T::SOFT_DELETE_COLUMN {
            Some(column) => {
                let stamp = self.ctx.now_epoch_ms();
                self.conn().execute(
                    &format!(
                        "UPDATE {} SET {column} = ?1 WHERE {} = ?2 AND {column} IS NULL;",
                        T::TABLE,
                        T::KEY_COLUMN
                    ),
                    rusqlite::params![stamp, &key],
                )?
            }
            None => self.conn().execute(
                &format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::KEY_COLUMN),
                [&key],
            )?,
        };

        if changed == 0 {
            return Err(not_found::<T>(&key));
        }
        info!(
            "event=repo_delete module=repo status=ok table={} soft={}",
            T::TABLE,
            T::SOFT_DELETE_COLUMN.is_some()
        );
        Ok(changed)
    }

    fn delete_where(&self, filter: &Filter) -> RepoResult<usize> {
        let entity = self
            .get_single(filter, false)?
            .ok_or(RepoError::NoMatch { table: T::TABLE })?;
        self.delete(&entity)
    }
}

/// Translates sort clauses into keys over the entity's columns, appending
/// the key column as a final tie-break.
fn entity_order_keys<T: Entity>(order_by: &str, table: &MappingTable) -> RepoResult<Vec<OrderKey>> {
    let mut keys = sort_keys(order_by, table)?
        .into_iter()
        .map(|key| {
            resolve_field::<T>(&key.path)
                .map(|column| OrderKey::new(column, key.direction))
                .ok_or_else(|| QueryError::UnknownPath {
                    path: key.path.clone(),
                    type_name: T::TYPE_NAME,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !keys.iter().any(|key| key.path == T::KEY_COLUMN) {
        keys.push(OrderKey::new(T::KEY_COLUMN, SortDirection::Ascending));
    }
    Ok(keys)
}

fn push_where<T: Entity>(
    sql: &mut String,
    binds: &mut Vec<FieldValue>,
    filter: &Filter,
    show_deleted: bool,
) -> RepoResult<()> {
    sql.push_str(" WHERE 1 = 1");
    if let (Some(column), false) = (T::SOFT_DELETE_COLUMN, show_deleted) {
        sql.push_str(&format!(" AND {column} IS NULL"));
    }
    filter.append_sql::<T>(sql, binds)
}

fn entity_values<T: Entity>(entity: &T) -> RepoResult<Vec<FieldValue>> {
    T::fields()
        .iter()
        .map(|column| field_of(entity, column))
        .collect()
}

fn field_of<T: Entity>(entity: &T, column: &str) -> RepoResult<FieldValue> {
    entity.field_value(column).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "{} lists field `{column}` but returns no value for it",
            T::TYPE_NAME
        ))
    })
}

fn not_found<T: Entity>(key: &FieldValue) -> RepoError {
    RepoError::NotFound {
        table: T::TABLE,
        key: key.to_string(),
    }
}

fn ensure_entity_ready<T: Entity>(conn: &Connection) -> RepoResult<()> {
    let identifiers = std::iter::once(T::TABLE)
        .chain(T::fields().iter().copied())
        .chain(T::SOFT_DELETE_COLUMN);
    for identifier in identifiers {
        if !is_sql_identifier(identifier) {
            return Err(RepoError::InvalidData(format!(
                "`{identifier}` declared by {} is not a valid SQL identifier",
                T::TYPE_NAME
            )));
        }
    }

    if !T::fields().contains(&T::KEY_COLUMN) {
        return Err(RepoError::InvalidData(format!(
            "{} key column `{}` is not one of its fields",
            T::TYPE_NAME,
            T::KEY_COLUMN
        )));
    }

    if !table_exists(conn, T::TABLE)? {
        return Err(RepoError::MissingRequiredTable(T::TABLE));
    }

    let columns = T::fields().iter().copied().chain(T::SOFT_DELETE_COLUMN);
    for column in columns {
        if !table_has_column(conn, T::TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: T::TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current.eq_ignore_ascii_case(column) {
            return Ok(true);
        }
    }
    Ok(false)
}
