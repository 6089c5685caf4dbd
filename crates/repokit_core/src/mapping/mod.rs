//! Declarative sort-key mapping between API-facing and storage-facing types.
//!
//! # Responsibility
//! - Hold immutable `key -> (paths, revert)` tables built at composition time.
//! - Look tables up by (source type, destination type) pair.
//! - Validate request field lists against tables and type field registries.
//!
//! # Invariants
//! - Tables never change after construction; sharing them across threads is safe.
//! - Exactly one table may be registered per type pair.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod property_mapper;
pub mod service;
pub mod type_service;

pub use property_mapper::{MappingTable, PropertyMapper, PropertyMapperValue};
pub use service::PropertyMapperService;

/// Fatal composition-time error in mapping registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    MissingMapper {
        source: &'static str,
        destination: &'static str,
    },
    AmbiguousMapper {
        source: &'static str,
        destination: &'static str,
        count: usize,
    },
    DuplicateKey(String),
    EmptyDestination(String),
    InvalidDestination { key: String, path: String },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMapper {
                source,
                destination,
            } => write!(
                f,
                "cannot find exact property mapper instance for <{source},{destination}>: none registered"
            ),
            Self::AmbiguousMapper {
                source,
                destination,
                count,
            } => write!(
                f,
                "cannot find exact property mapper instance for <{source},{destination}>: {count} registered"
            ),
            Self::DuplicateKey(key) => write!(f, "mapping key `{key}` is declared more than once"),
            Self::EmptyDestination(key) => {
                write!(f, "mapping key `{key}` has no destination properties")
            }
            Self::InvalidDestination { key, path } => {
                write!(f, "mapping key `{key}` has invalid destination path `{path}`")
            }
        }
    }
}

impl Error for ConfigurationError {}
