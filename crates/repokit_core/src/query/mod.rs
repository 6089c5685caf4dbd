//! Request-driven query utilities: dynamic sort, pagination and shaping.
//!
//! # Responsibility
//! - Parse the comma-separated sort/field mini-language used by API callers.
//! - Window ordered sequences into pages with count-derived metadata.
//! - Project values onto caller-selected field subsets.
//!
//! # Invariants
//! - Every operation is all-or-nothing: invalid tokens fail the whole call.
//! - Tokens are validated before any data is read or reordered.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod paginated;
pub mod shape;
pub mod sort;

static SQL_IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid identifier regex")
});

pub type QueryResult<T> = Result<T, QueryError>;

/// Caller-facing validation error for sort, page and shape requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Caller supplied an out-of-range argument (zero page size, zero page number).
    InvalidArgument(String),
    /// Sort key has no entry in the mapping table.
    KeyNotFound(String),
    /// Shaping token does not name a field of the source type.
    FieldNotFound {
        field: String,
        type_name: &'static str,
    },
    /// Shaping token resolves to a field that was already selected.
    DuplicateField {
        field: String,
        type_name: &'static str,
    },
    /// Translated sort path is not a field/column of the sorted type.
    UnknownPath {
        path: String,
        type_name: &'static str,
    },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::KeyNotFound(key) => write!(f, "key mapping for `{key}` is missing"),
            Self::FieldNotFound { field, type_name } => {
                write!(f, "field `{field}` wasn't found on `{type_name}`")
            }
            Self::DuplicateField { field, type_name } => {
                write!(f, "field `{field}` of `{type_name}` was requested more than once")
            }
            Self::UnknownPath { path, type_name } => {
                write!(f, "sort path `{path}` is not a field of `{type_name}`")
            }
        }
    }
}

impl Error for QueryError {}

/// Returns whether `value` is safe to splice into SQL as a (dotted) identifier.
pub fn is_sql_identifier(value: &str) -> bool {
    SQL_IDENTIFIER_RE.is_match(value)
}

/// Splits a comma-separated token list, trimming each token.
///
/// Blank input yields no tokens; blank tokens between commas are kept so
/// callers can reject them.
pub(crate) fn split_tokens(input: &str) -> Vec<&str> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    input.split(',').map(str::trim).collect()
}

/// Strips everything from the first space, dropping a direction suffix.
pub(crate) fn token_key(token: &str) -> &str {
    match token.find(' ') {
        Some(index) => &token[..index],
        None => token,
    }
}
