//! Mapping entries and typed mapping tables.

use super::ConfigurationError;
use crate::query::is_sql_identifier;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Destination paths for one logical key, plus the direction-flip flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapperValue {
    destination_properties: Vec<String>,
    revert: bool,
}

impl PropertyMapperValue {
    pub fn new<I, S>(destination_properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            destination_properties: destination_properties.into_iter().map(Into::into).collect(),
            revert: false,
        }
    }

    /// Marks the mapping as direction-reversing.
    ///
    /// `"popularity desc"` mapped with revert onto `negative_rank` sorts by
    /// `negative_rank ASC`.
    pub fn reverted(mut self) -> Self {
        self.revert = true;
        self
    }

    pub fn destination_properties(&self) -> &[String] {
        &self.destination_properties
    }

    pub fn revert(&self) -> bool {
        self.revert
    }
}

/// Immutable lookup table from logical key to destination paths.
///
/// Keys are matched exactly (case-sensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    values: HashMap<String, PropertyMapperValue>,
}

impl MappingTable {
    /// Builds a table, rejecting duplicate keys, empty destinations and
    /// destination paths that are not SQL identifiers.
    pub fn try_from_entries<I, K>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, PropertyMapperValue)>,
        K: Into<String>,
    {
        let mut values = HashMap::new();
        for (key, value) in entries {
            let key = key.into();
            if value.destination_properties.is_empty() {
                return Err(ConfigurationError::EmptyDestination(key));
            }
            if let Some(path) = value
                .destination_properties
                .iter()
                .find(|path| !is_sql_identifier(path))
            {
                return Err(ConfigurationError::InvalidDestination {
                    key,
                    path: path.clone(),
                });
            }
            if values.contains_key(&key) {
                return Err(ConfigurationError::DuplicateKey(key));
            }
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&PropertyMapperValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = self.values.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A mapping table tagged with the (source, destination) types it maps between.
///
/// `S` is the API-facing type whose keys callers send; `D` is the type whose
/// fields/columns the keys resolve to.
pub struct PropertyMapper<S, D> {
    table: MappingTable,
    _types: PhantomData<fn() -> (S, D)>,
}

impl<S, D> PropertyMapper<S, D> {
    pub fn new(table: MappingTable) -> Self {
        Self {
            table,
            _types: PhantomData,
        }
    }

    pub fn try_from_entries<I, K>(entries: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, PropertyMapperValue)>,
        K: Into<String>,
    {
        MappingTable::try_from_entries(entries).map(Self::new)
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn into_table(self) -> MappingTable {
        self.table
    }
}

impl<S, D> Debug for PropertyMapper<S, D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyMapper")
            .field("source", &std::any::type_name::<S>())
            .field("destination", &std::any::type_name::<D>())
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{MappingTable, PropertyMapperValue};
    use crate::mapping::ConfigurationError;

    #[test]
    fn rejects_empty_destinations() {
        let empty = PropertyMapperValue::new(Vec::<String>::new());
        let err = MappingTable::try_from_entries([("name", empty)]).unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyDestination("name".to_string()));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = MappingTable::try_from_entries([
            ("name", PropertyMapperValue::new(["first_name"])),
            ("name", PropertyMapperValue::new(["last_name"])),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateKey("name".to_string()));
    }

    #[test]
    fn rejects_destination_paths_that_are_not_identifiers() {
        let err = MappingTable::try_from_entries([(
            "name",
            PropertyMapperValue::new(["name; DROP TABLE authors"]),
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDestination { .. }));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let table =
            MappingTable::try_from_entries([("name", PropertyMapperValue::new(["full_name"]))])
                .unwrap();
        assert!(table.contains_key("name"));
        assert!(!table.contains_key("Name"));
        assert_eq!(table.keys(), vec!["name"]);
    }
}
