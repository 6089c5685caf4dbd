//! Dynamic multi-key sorting driven by a mapping table.
//!
//! # Responsibility
//! - Parse `field [desc]` clauses from request input.
//! - Translate clauses into ordered `(path, direction)` keys.
//! - Apply keys either in memory or as a SQL `ORDER BY` fragment.
//!
//! # Invariants
//! - The first clause is the primary key; later clauses only break ties.
//! - A mapping with `revert` flips the clause direction for each of its paths.
//! - In-memory sorting is stable, so re-applying the same keys is a no-op.

use super::{split_tokens, token_key, QueryError, QueryResult};
use crate::mapping::MappingTable;
use crate::model::entity::{resolve_field, Shape};
use crate::model::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const DESCENDING_SUFFIX: &str = " desc";

/// Direction of one order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// One parsed request clause, before mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: String,
    pub descending: bool,
}

impl SortClause {
    /// Parses one raw clause such as `"name desc"` or `" age "`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            field: token_key(trimmed).to_string(),
            descending: trimmed.ends_with(DESCENDING_SUFFIX),
        }
    }
}

/// Parses a comma-separated clause list, keeping caller precedence.
pub fn parse_sort_clauses(input: &str) -> Vec<SortClause> {
    split_tokens(input).into_iter().map(SortClause::parse).collect()
}

/// Concrete ordering key produced by translating a clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub path: String,
    pub direction: SortDirection,
}

impl OrderKey {
    pub fn new(path: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            path: path.into(),
            direction,
        }
    }
}

/// Translates `clauses` through `table` into primary-first order keys.
///
/// Blank input yields no keys. Unknown clause keys fail with
/// [`QueryError::KeyNotFound`].
pub fn sort_keys(clauses: &str, table: &MappingTable) -> QueryResult<Vec<OrderKey>> {
    let mut keys = Vec::new();
    for clause in parse_sort_clauses(clauses) {
        let mapping = table
            .get(&clause.field)
            .ok_or_else(|| QueryError::KeyNotFound(clause.field.clone()))?;

        let mut direction = SortDirection::from_descending(clause.descending);
        if mapping.revert() {
            direction = direction.reversed();
        }

        for path in mapping.destination_properties() {
            keys.push(OrderKey::new(path.as_str(), direction));
        }
    }
    Ok(keys)
}

/// Renders keys as the body of a SQL `ORDER BY` clause.
///
/// Paths are expected to be validated identifiers.
pub fn order_by_sql(keys: &[OrderKey]) -> String {
    keys.iter()
        .map(|key| format!("{} {}", key.path, key.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stably sorts `items` by `keys`, primary key first.
///
/// Every path must resolve (ignoring case) to a field of `T`; otherwise the
/// call fails with [`QueryError::UnknownPath`] and nothing is reordered.
pub fn apply_sort<T: Shape>(items: Vec<T>, keys: &[OrderKey]) -> QueryResult<Vec<T>> {
    if keys.is_empty() {
        return Ok(items);
    }

    let resolved = resolve_keys::<T>(keys)?;
    let mut decorated = items
        .into_iter()
        .map(|item| {
            let values = resolved
                .iter()
                .map(|(field, _)| item.field_value(field).unwrap_or(FieldValue::Null))
                .collect::<Vec<_>>();
            (values, item)
        })
        .collect::<Vec<_>>();

    decorated.sort_by(|(left, _), (right, _)| compare_values(left, right, &resolved));
    Ok(decorated.into_iter().map(|(_, item)| item).collect())
}

/// Translates `clauses` through `table` and sorts `items` in memory.
pub fn sort<T: Shape>(items: Vec<T>, clauses: &str, table: &MappingTable) -> QueryResult<Vec<T>> {
    let keys = sort_keys(clauses, table)?;
    apply_sort(items, &keys)
}

/// Checks every key path against the fields of `T` without sorting.
pub fn validate_paths<T: Shape>(keys: &[OrderKey]) -> QueryResult<()> {
    resolve_keys::<T>(keys).map(|_| ())
}

fn resolve_keys<T: Shape>(keys: &[OrderKey]) -> QueryResult<Vec<(&'static str, SortDirection)>> {
    keys.iter()
        .map(|key| {
            resolve_field::<T>(&key.path)
                .map(|field| (field, key.direction))
                .ok_or_else(|| QueryError::UnknownPath {
                    path: key.path.clone(),
                    type_name: T::TYPE_NAME,
                })
        })
        .collect()
}

fn compare_values(
    left: &[FieldValue],
    right: &[FieldValue],
    resolved: &[(&'static str, SortDirection)],
) -> Ordering {
    for ((l, r), (_, direction)) in left.iter().zip(right.iter()).zip(resolved.iter()) {
        let ordering = direction.apply(l.compare(r));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::{apply_sort, order_by_sql, sort, sort_keys, OrderKey, SortClause, SortDirection};
    use crate::mapping::property_mapper::PropertyMapperValue;
    use crate::mapping::MappingTable;
    use crate::model::entity::Shape;
    use crate::model::value::FieldValue;
    use crate::query::QueryError;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        id: i64,
        full_name: &'static str,
        age: i64,
        rank: i64,
    }

    impl Shape for Person {
        const TYPE_NAME: &'static str = "Person";

        fn fields() -> &'static [&'static str] {
            &["id", "fullName", "age", "rank"]
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "id" => Some(self.id.into()),
                "fullName" => Some(self.full_name.into()),
                "age" => Some(self.age.into()),
                "rank" => Some(self.rank.into()),
                _ => None,
            }
        }
    }

    fn person(id: i64, full_name: &'static str, age: i64, rank: i64) -> Person {
        Person {
            id,
            full_name,
            age,
            rank,
        }
    }

    fn fixture() -> Vec<Person> {
        vec![
            person(1, "bob", 40, 3),
            person(2, "alice", 30, 1),
            person(3, "bob", 25, 5),
            person(4, "carol", 35, 2),
            person(5, "alice", 22, 4),
        ]
    }

    fn table() -> MappingTable {
        MappingTable::try_from_entries([
            ("name", PropertyMapperValue::new(["fullName"])),
            ("age", PropertyMapperValue::new(["age"])),
            ("score", PropertyMapperValue::new(["rank"]).reverted()),
            ("identity", PropertyMapperValue::new(["fullName", "age"])),
        ])
        .unwrap()
    }

    fn ids(people: &[Person]) -> Vec<i64> {
        people.iter().map(|p| p.id).collect()
    }

    #[test]
    fn parse_detects_desc_suffix_and_strips_key() {
        assert_eq!(
            SortClause::parse("  name desc "),
            SortClause {
                field: "name".to_string(),
                descending: true
            }
        );
        assert_eq!(
            SortClause::parse("age"),
            SortClause {
                field: "age".to_string(),
                descending: false
            }
        );
    }

    #[test]
    fn blank_clauses_are_a_no_op() {
        assert!(sort_keys("  ", &table()).unwrap().is_empty());
        let sorted = sort(fixture(), "", &table()).unwrap();
        assert_eq!(ids(&sorted), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn name_desc_then_age_orders_by_full_name_desc_then_age_asc() {
        let sorted = sort(fixture(), "name desc,age", &table()).unwrap();
        // carol, bob(25), bob(40), alice(22), alice(30)
        assert_eq!(ids(&sorted), vec![4, 3, 1, 5, 2]);
    }

    #[test]
    fn revert_flag_flips_direction() {
        let keys = sort_keys("score desc", &table()).unwrap();
        assert_eq!(keys, vec![OrderKey::new("rank", SortDirection::Ascending)]);

        let sorted = sort(fixture(), "score desc", &table()).unwrap();
        assert_eq!(ids(&sorted), vec![2, 4, 1, 5, 3]);
    }

    #[test]
    fn composite_mapping_fans_out_in_declared_order() {
        let keys = sort_keys("identity desc", &table()).unwrap();
        assert_eq!(
            keys,
            vec![
                OrderKey::new("fullName", SortDirection::Descending),
                OrderKey::new("age", SortDirection::Descending),
            ]
        );
        assert_eq!(order_by_sql(&keys), "fullName DESC, age DESC");
    }

    #[test]
    fn unknown_key_fails_with_key_not_found() {
        let err = sort_keys("name, height desc", &table()).unwrap_err();
        assert_eq!(err, QueryError::KeyNotFound("height".to_string()));
    }

    #[test]
    fn sorting_is_idempotent_and_stable_for_ties() {
        let once = sort(fixture(), "name", &table()).unwrap();
        // ties keep input order: alice(2) before alice(5), bob(1) before bob(3)
        assert_eq!(ids(&once), vec![2, 5, 1, 3, 4]);

        let twice = sort(once.clone(), "name", &table()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_path_is_rejected_before_sorting() {
        let keys = vec![OrderKey::new("salary", SortDirection::Ascending)];
        let err = apply_sort(fixture(), &keys).unwrap_err();
        assert!(matches!(err, QueryError::UnknownPath { ref path, type_name: "Person" } if path == "salary"));
    }

    #[derive(Debug, Clone)]
    struct Reading {
        id: usize,
        value: f64,
    }

    impl Shape for Reading {
        const TYPE_NAME: &'static str = "Reading";

        fn fields() -> &'static [&'static str] {
            &["id", "value"]
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "id" => Some(FieldValue::Integer(self.id as i64)),
                "value" => Some(FieldValue::Real(self.value)),
                _ => None,
            }
        }
    }

    fn readings(seed: u64, len: usize) -> Vec<Reading> {
        let mut state = seed;
        (0..len)
            .map(|id| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                let bits = state >> 33;
                let value = if bits % 4 == 0 {
                    f64::NAN
                } else {
                    (bits % 1_000) as f64 / 10.0 - 50.0
                };
                Reading { id, value }
            })
            .collect()
    }

    #[test]
    fn nan_readings_sort_after_every_number() {
        for seed in 0..200 {
            let items = readings(seed, 64);
            let nan_count = items.iter().filter(|r| r.value.is_nan()).count();

            let ascending = apply_sort(
                items.clone(),
                &[OrderKey::new("value", SortDirection::Ascending)],
            )
            .unwrap();
            assert_eq!(ascending.len(), 64);
            let (numbers, nans) = ascending.split_at(64 - nan_count);
            assert!(nans.iter().all(|r| r.value.is_nan()));
            assert!(numbers.windows(2).all(|w| w[0].value <= w[1].value));
            // NaN ties keep input order
            assert!(nans.windows(2).all(|w| w[0].id < w[1].id));

            let descending = apply_sort(
                items,
                &[OrderKey::new("value", SortDirection::Descending)],
            )
            .unwrap();
            assert!(descending[..nan_count].iter().all(|r| r.value.is_nan()));
            assert!(descending[nan_count..]
                .windows(2)
                .all(|w| w[0].value >= w[1].value));
        }
    }
}
