//! Column predicates for repository reads.

use super::repository::{RepoError, RepoResult};
use crate::model::entity::{resolve_field, Entity};
use crate::model::value::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

/// Conjunction of column conditions. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Adds `column = value`; a NULL value becomes `column IS NULL`.
    pub fn eq(self, column: &str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.is_null(column);
        }
        self.push(column, FilterOp::Eq, value)
    }

    pub fn ne(self, column: &str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        if value.is_null() {
            return self.is_not_null(column);
        }
        self.push(column, FilterOp::Ne, value)
    }

    pub fn lt(self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.push(column, FilterOp::Lt, value.into())
    }

    pub fn le(self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.push(column, FilterOp::Le, value.into())
    }

    pub fn gt(self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.push(column, FilterOp::Gt, value.into())
    }

    pub fn ge(self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.push(column, FilterOp::Ge, value.into())
    }

    pub fn like(self, column: &str, pattern: impl Into<String>) -> Self {
        self.push(column, FilterOp::Like, FieldValue::Text(pattern.into()))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push(column, FilterOp::IsNull, FieldValue::Null)
    }

    pub fn is_not_null(self, column: &str) -> Self {
        self.push(column, FilterOp::IsNotNull, FieldValue::Null)
    }

    fn push(mut self, column: &str, op: FilterOp, value: FieldValue) -> Self {
        self.conditions.push(Condition {
            column: column.trim().to_string(),
            op,
            value,
        });
        self
    }

    /// Appends ` AND <condition>` fragments for `T`, collecting bind values.
    ///
    /// Columns resolve case-insensitively against the entity's fields and
    /// its soft-delete column; anything else is rejected.
    pub(crate) fn append_sql<T: Entity>(
        &self,
        sql: &mut String,
        binds: &mut Vec<FieldValue>,
    ) -> RepoResult<()> {
        for condition in &self.conditions {
            let column = resolve_column::<T>(&condition.column)?;
            match condition.op {
                FilterOp::IsNull | FilterOp::IsNotNull => {
                    sql.push_str(&format!(" AND {column} {}", condition.op.as_sql()));
                }
                op => {
                    sql.push_str(&format!(" AND {column} {} ?", op.as_sql()));
                    binds.push(condition.value.clone());
                }
            }
        }
        Ok(())
    }
}

fn resolve_column<T: Entity>(column: &str) -> RepoResult<&'static str> {
    if let Some(field) = resolve_field::<T>(column) {
        return Ok(field);
    }
    match T::SOFT_DELETE_COLUMN {
        Some(soft_delete) if soft_delete.eq_ignore_ascii_case(column) => Ok(soft_delete),
        _ => Err(RepoError::UnknownColumn {
            table: T::TABLE,
            column: column.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::Filter;
    use crate::model::entity::{Entity, FromRow, Shape};
    use crate::model::value::FieldValue;
    use crate::repo::RepoError;
    use rusqlite::Row;

    struct Book;

    impl Shape for Book {
        const TYPE_NAME: &'static str = "Book";

        fn fields() -> &'static [&'static str] {
            &["id", "title", "pages"]
        }

        fn field_value(&self, _field: &str) -> Option<FieldValue> {
            None
        }
    }

    impl FromRow for Book {
        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Book)
        }
    }

    impl Entity for Book {
        const TABLE: &'static str = "books";
        const KEY_COLUMN: &'static str = "id";
    }

    #[test]
    fn conditions_render_with_canonical_columns_and_binds() {
        let filter = Filter::new()
            .eq("TITLE", "Dune")
            .gt("pages", 300)
            .eq("pages", FieldValue::Null)
            .is_not_null("Deleted_At");

        let mut sql = String::new();
        let mut binds = Vec::new();
        filter.append_sql::<Book>(&mut sql, &mut binds).unwrap();

        assert_eq!(
            sql,
            " AND title = ? AND pages > ? AND pages IS NULL AND deleted_at IS NOT NULL"
        );
        assert_eq!(binds, vec![FieldValue::from("Dune"), FieldValue::from(300)]);
    }

    #[test]
    fn empty_filter_renders_nothing() {
        let mut sql = String::new();
        let mut binds = Vec::new();
        Filter::new()
            .append_sql::<Book>(&mut sql, &mut binds)
            .unwrap();
        assert!(sql.is_empty());
        assert!(binds.is_empty());
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn unknown_column_is_rejected() {
        let mut sql = String::new();
        let mut binds = Vec::new();
        let err = Filter::new()
            .eq("author", "Herbert")
            .append_sql::<Book>(&mut sql, &mut binds)
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::UnknownColumn { table: "books", column } if column == "author"
        ));
    }
}
