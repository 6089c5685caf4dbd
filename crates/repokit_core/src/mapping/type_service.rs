//! Field-list validation against a type's field registry.

use crate::model::entity::{resolve_field, Shape};
use crate::query::split_tokens;

/// Returns whether every token in `fields` names a field of `T`, ignoring case.
///
/// Blank input is always valid.
pub fn type_has_properties<T: Shape>(fields: &str) -> bool {
    split_tokens(fields)
        .into_iter()
        .all(|token| resolve_field::<T>(token).is_some())
}

#[cfg(test)]
mod tests {
    use super::type_has_properties;
    use crate::model::entity::Shape;
    use crate::model::value::FieldValue;

    struct Book;

    impl Shape for Book {
        const TYPE_NAME: &'static str = "Book";

        fn fields() -> &'static [&'static str] {
            &["Id", "Title"]
        }

        fn field_value(&self, _field: &str) -> Option<FieldValue> {
            None
        }
    }

    #[test]
    fn accepts_blank_and_known_fields_case_insensitively() {
        assert!(type_has_properties::<Book>(""));
        assert!(type_has_properties::<Book>(" title , ID "));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(!type_has_properties::<Book>("Title,Isbn"));
    }
}
