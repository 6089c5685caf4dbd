//! Generic repository toolkit over SQLite.
//!
//! Declarative sort mapping, dynamic multi-key sorting, pagination, field
//! shaping and a soft-delete aware repository facade.

pub mod config;
pub mod db;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{
    open_db, open_db_in_memory, Clock, Command, DataContext, DbError, DbResult, FixedClock,
    Migration, MultiResults, ProcedureCatalog, SharedDataContext, SystemClock,
};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status, LoggingError};
pub use mapping::service::PropertyMapperService;
pub use mapping::type_service::type_has_properties;
pub use mapping::{ConfigurationError, MappingTable, PropertyMapper, PropertyMapperValue};
pub use model::entity::{Entity, FromRow, Shape, DEFAULT_SOFT_DELETE_COLUMN};
pub use model::value::{FieldValue, ShapedRecord};
pub use query::paginated::{
    paginate, to_paginated_list, PageRequest, PaginatedList, PaginationMetadata,
};
pub use query::shape::{resolve_fields, shape, shape_to_enumerable};
pub use query::sort::{sort, sort_keys, OrderKey, SortClause, SortDirection};
pub use query::{QueryError, QueryResult};
pub use repo::{
    AsyncRepository, Filter, PageQuery, RepoError, RepoResult, Repository, SqliteRepository,
};
pub use service::{ResourceRequest, ResourceService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
