//! Field-subset projection ("data shaping").
//!
//! # Responsibility
//! - Resolve a caller field list against a `Shape` type.
//! - Project each value into a `ShapedRecord` holding only those fields.
//!
//! # Invariants
//! - Blank field lists select every field in declaration order.
//! - Record keys are canonical field names, in request order.
//! - Element order of the source is preserved.

use super::{split_tokens, QueryError, QueryResult};
use crate::model::entity::{resolve_field, Shape};
use crate::model::value::{FieldValue, ShapedRecord};

/// Resolves `fields` to canonical field names of `T`.
///
/// Fails with [`QueryError::FieldNotFound`] on unknown tokens and with
/// [`QueryError::DuplicateField`] when two tokens name the same field.
pub fn resolve_fields<T: Shape>(fields: &str) -> QueryResult<Vec<&'static str>> {
    let tokens = split_tokens(fields);
    if tokens.is_empty() {
        return Ok(T::fields().to_vec());
    }

    let mut resolved: Vec<&'static str> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let field = resolve_field::<T>(token).ok_or_else(|| QueryError::FieldNotFound {
            field: token.to_string(),
            type_name: T::TYPE_NAME,
        })?;
        if resolved.contains(&field) {
            return Err(QueryError::DuplicateField {
                field: field.to_string(),
                type_name: T::TYPE_NAME,
            });
        }
        resolved.push(field);
    }
    Ok(resolved)
}

/// Shapes every element of `source` down to `fields`.
pub fn shape_to_enumerable<'a, T, I>(source: I, fields: &str) -> QueryResult<Vec<ShapedRecord>>
where
    T: Shape + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let resolved = resolve_fields::<T>(fields)?;
    Ok(source
        .into_iter()
        .map(|item| shape_resolved(item, &resolved))
        .collect())
}

/// Shapes a single value down to `fields`.
pub fn shape<T: Shape>(item: &T, fields: &str) -> QueryResult<ShapedRecord> {
    let resolved = resolve_fields::<T>(fields)?;
    Ok(shape_resolved(item, &resolved))
}

/// Projects `item` onto fields already returned by [`resolve_fields`].
pub fn shape_resolved<T: Shape>(item: &T, fields: &[&'static str]) -> ShapedRecord {
    let mut record = ShapedRecord::new();
    for field in fields {
        let value = item.field_value(field).unwrap_or(FieldValue::Null);
        record.insert(*field, value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::{resolve_fields, shape, shape_to_enumerable};
    use crate::model::entity::Shape;
    use crate::model::value::FieldValue;
    use crate::query::QueryError;

    struct Author {
        id: i64,
        name: &'static str,
        age: Option<i64>,
    }

    impl Shape for Author {
        const TYPE_NAME: &'static str = "Author";

        fn fields() -> &'static [&'static str] {
            &["Id", "Name", "Age"]
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "Id" => Some(self.id.into()),
                "Name" => Some(self.name.into()),
                "Age" => Some(self.age.into()),
                _ => None,
            }
        }
    }

    fn authors() -> Vec<Author> {
        vec![
            Author {
                id: 1,
                name: "Ada",
                age: Some(36),
            },
            Author {
                id: 2,
                name: "Grace",
                age: None,
            },
        ]
    }

    #[test]
    fn blank_fields_select_all_in_declaration_order() {
        let shaped = shape_to_enumerable(&authors(), "").unwrap();
        assert_eq!(shaped.len(), 2);
        assert_eq!(shaped[0].keys().collect::<Vec<_>>(), vec!["Id", "Name", "Age"]);
        assert_eq!(shaped[1].get("Age"), Some(&FieldValue::Null));
    }

    #[test]
    fn explicit_fields_keep_request_order_and_element_order() {
        let shaped = shape_to_enumerable(&authors(), "age, NAME").unwrap();
        assert_eq!(shaped[0].keys().collect::<Vec<_>>(), vec!["Age", "Name"]);
        assert_eq!(shaped[0].get("Name"), Some(&FieldValue::from("Ada")));
        assert_eq!(shaped[1].get("Name"), Some(&FieldValue::from("Grace")));
        assert!(shaped[0].get("Id").is_none());
    }

    #[test]
    fn unknown_field_names_field_and_type() {
        let err = shape_to_enumerable(&authors(), "Name, Email").unwrap_err();
        assert_eq!(
            err,
            QueryError::FieldNotFound {
                field: "Email".to_string(),
                type_name: "Author"
            }
        );
        assert!(err.to_string().contains("Author"));
    }

    #[test]
    fn duplicate_tokens_are_rejected_even_with_different_case() {
        let err = resolve_fields::<Author>("name,Name").unwrap_err();
        assert!(matches!(err, QueryError::DuplicateField { .. }));
    }

    #[test]
    fn shape_single_value() {
        let record = shape(&authors()[0], "id").unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("Id"), Some(&FieldValue::Integer(1)));
    }
}
