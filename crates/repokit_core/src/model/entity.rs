//! Compile-time field registry and persistence contracts.
//!
//! # Responsibility
//! - Describe which fields a type exposes, in declaration order.
//! - Describe how an entity maps onto one SQLite table.
//!
//! # Invariants
//! - `Shape::fields()` lists every name `field_value` answers for.
//! - `Entity::KEY_COLUMN` is one of `Shape::fields()`.
//! - Rows with a non-NULL soft-delete column are tombstones.

use super::value::FieldValue;
use rusqlite::Row;

/// Conventional soft-delete column used when an entity does not override it.
pub const DEFAULT_SOFT_DELETE_COLUMN: &str = "deleted_at";

/// Field registry implemented per type instead of runtime reflection.
pub trait Shape {
    /// Human readable type name used in error messages.
    const TYPE_NAME: &'static str;

    /// Public field names in declaration order.
    fn fields() -> &'static [&'static str];

    /// Returns the value of `field`, or `None` when the type has no such field.
    ///
    /// Lookup is exact; case-insensitive resolution happens in callers.
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

/// Decodes one result row into a value.
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// A `Shape` persisted as one row of `TABLE`.
///
/// Every field in `fields()` is a column of the table; the soft-delete
/// column is managed by the repository and does not need to be a field.
pub trait Entity: Shape + FromRow {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// `None` turns deletes into physical row removal.
    const SOFT_DELETE_COLUMN: Option<&'static str> = Some(DEFAULT_SOFT_DELETE_COLUMN);

    /// Value of the key column for this instance.
    fn key(&self) -> FieldValue {
        self.field_value(Self::KEY_COLUMN).unwrap_or(FieldValue::Null)
    }
}

/// Resolves `token` against the fields of `T`, ignoring ASCII case.
///
/// Returns the canonical field name as declared by `T`.
pub fn resolve_field<T: Shape>(token: &str) -> Option<&'static str> {
    T::fields()
        .iter()
        .copied()
        .find(|field| field.eq_ignore_ascii_case(token))
}
