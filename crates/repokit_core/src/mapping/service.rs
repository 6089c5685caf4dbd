//! Registry of mapping tables keyed by (source, destination) type pair.
//!
//! # Responsibility
//! - Collect property mappers during composition.
//! - Resolve the single table for a type pair and validate sort-key lists.
//!
//! # Invariants
//! - Registration happens before the service is shared; lookups are read-only.
//! - A type pair with zero or several tables is a configuration error.

use super::{ConfigurationError, MappingTable, PropertyMapper};
use crate::query::{split_tokens, token_key};
use std::any::{type_name, TypeId};

struct RegisteredMapper {
    source: TypeId,
    destination: TypeId,
    table: MappingTable,
}

/// Mapping-table registry used to validate and translate sort requests.
#[derive(Default)]
pub struct PropertyMapperService {
    mappers: Vec<RegisteredMapper>,
}

impl PropertyMapperService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one mapper.
    ///
    /// Registering a second mapper for the same pair is accepted here and
    /// reported as [`ConfigurationError::AmbiguousMapper`] on lookup.
    pub fn register<S: 'static, D: 'static>(&mut self, mapper: PropertyMapper<S, D>) {
        self.mappers.push(RegisteredMapper {
            source: TypeId::of::<S>(),
            destination: TypeId::of::<D>(),
            table: mapper.into_table(),
        });
    }

    /// Builder-style variant of [`PropertyMapperService::register`].
    pub fn with_mapper<S: 'static, D: 'static>(mut self, mapper: PropertyMapper<S, D>) -> Self {
        self.register(mapper);
        self
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Returns the single table registered for `(S, D)`.
    pub fn property_mapper<S: 'static, D: 'static>(
        &self,
    ) -> Result<&MappingTable, ConfigurationError> {
        let source = TypeId::of::<S>();
        let destination = TypeId::of::<D>();
        let mut matches = self
            .mappers
            .iter()
            .filter(|mapper| mapper.source == source && mapper.destination == destination);

        match (matches.next(), matches.count()) {
            (Some(mapper), 0) => Ok(&mapper.table),
            (None, _) => Err(ConfigurationError::MissingMapper {
                source: type_name::<S>(),
                destination: type_name::<D>(),
            }),
            (Some(_), rest) => Err(ConfigurationError::AmbiguousMapper {
                source: type_name::<S>(),
                destination: type_name::<D>(),
                count: rest + 1,
            }),
        }
    }

    /// Checks that every key in a sort-clause list exists in the `(S, D)` table.
    ///
    /// Blank input is always valid. Direction suffixes are ignored.
    pub fn valid_mapping_exists_for<S: 'static, D: 'static>(
        &self,
        fields: &str,
    ) -> Result<bool, ConfigurationError> {
        let tokens = split_tokens(fields);
        if tokens.is_empty() {
            return Ok(true);
        }

        let table = self.property_mapper::<S, D>()?;
        Ok(tokens
            .into_iter()
            .all(|token| table.contains_key(token_key(token))))
    }
}
