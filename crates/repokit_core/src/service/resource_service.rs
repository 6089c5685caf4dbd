//! Resource read service.
//!
//! # Responsibility
//! - Validate caller sort and field lists before touching storage.
//! - Page entities, convert them to a resource type and shape the result.
//!
//! # Invariants
//! - Validation failures never reach the repository.
//! - Sort clauses name resource properties; the registered
//!   `(resource, entity)` mapping table translates them to columns.

use crate::mapping::{ConfigurationError, MappingTable, PropertyMapperService};
use crate::mapping::type_service::type_has_properties;
use crate::model::entity::{Entity, Shape};
use crate::model::value::{FieldValue, ShapedRecord};
use crate::query::paginated::{PageRequest, PaginatedList};
use crate::query::shape::{resolve_fields, shape_resolved};
use crate::query::sort::sort_keys;
use crate::query::{split_tokens, QueryError};
use crate::repo::{Filter, PageQuery, RepoError, Repository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::time::Instant;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Configuration(ConfigurationError),
    /// Caller input was rejected before any query ran.
    Validation(QueryError),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "mapping configuration error: {err}"),
            Self::Validation(err) => write!(f, "invalid request: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ConfigurationError> for ServiceError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<QueryError> for ServiceError {
    fn from(value: QueryError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Query(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Collection request as it arrives from a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub page_number: u32,
    pub page_size: u32,
    /// Comma-separated resource properties, each optionally suffixed ` desc`.
    pub order_by: String,
    /// Comma-separated resource properties to keep; blank keeps all.
    pub fields: String,
    pub show_deleted: bool,
    pub filter: Filter,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: String::new(),
            fields: String::new(),
            show_deleted: false,
            filter: Filter::default(),
        }
    }
}

/// Read service exposing entities `T` as shaped resources `D`.
pub struct ResourceService<'m, T, D, R> {
    repo: R,
    mappers: &'m PropertyMapperService,
    _types: PhantomData<fn() -> (T, D)>,
}

impl<'m, T, D, R> ResourceService<'m, T, D, R>
where
    T: Entity + 'static,
    D: Shape + From<T> + 'static,
    R: Repository<T>,
{
    pub fn new(repo: R, mappers: &'m PropertyMapperService) -> Self {
        Self {
            repo,
            mappers,
            _types: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Checks `order_by` against the mapping table and `fields` against `D`.
    ///
    /// Returns the resolved field list on success.
    pub fn validate(&self, request: &ResourceRequest) -> ServiceResult<Vec<&'static str>> {
        if !self
            .mappers
            .valid_mapping_exists_for::<D, T>(&request.order_by)?
        {
            let table = self.mappers.property_mapper::<D, T>()?;
            let detail = sort_keys(&request.order_by, table)
                .err()
                .unwrap_or_else(|| QueryError::KeyNotFound(request.order_by.clone()));
            return Err(reject(detail));
        }

        if !type_has_properties::<D>(&request.fields) {
            let detail = resolve_fields::<D>(&request.fields)
                .err()
                .unwrap_or_else(|| QueryError::FieldNotFound {
                    field: request.fields.clone(),
                    type_name: D::TYPE_NAME,
                });
            return Err(reject(detail));
        }

        resolve_fields::<D>(&request.fields).map_err(reject)
    }

    /// Returns one page of shaped resources.
    pub fn list(&self, request: &ResourceRequest) -> ServiceResult<PaginatedList<ShapedRecord>> {
        let started_at = Instant::now();
        let fields = self.validate(request)?;
        let page = PageRequest::new(request.page_number, request.page_size).map_err(reject)?;

        let empty = MappingTable::default();
        let table = if split_tokens(&request.order_by).is_empty() {
            &empty
        } else {
            self.mappers.property_mapper::<D, T>()?
        };

        let query = PageQuery::new(page)
            .with_filter(request.filter.clone())
            .with_order_by(request.order_by.clone())
            .with_show_deleted(request.show_deleted);
        let entities = self.repo.paginate(&query, table)?;
        let shaped = entities.map(|entity| shape_resolved(&D::from(entity), &fields));

        info!(
            "event=resource_list module=service status=ok resource={} page={} items={} total={} duration_ms={}",
            D::TYPE_NAME,
            shaped.page_number(),
            shaped.len(),
            shaped.total_count(),
            started_at.elapsed().as_millis()
        );
        Ok(shaped)
    }

    /// Returns one shaped resource by entity key.
    pub fn get(&self, key: impl Into<FieldValue>, fields: &str) -> ServiceResult<ShapedRecord> {
        let resolved = resolve_fields::<D>(fields).map_err(reject)?;
        let key = key.into();
        let entity = self
            .repo
            .get_by_key(&key, false)?
            .ok_or_else(|| RepoError::NotFound {
                table: T::TABLE,
                key: key.to_string(),
            })?;
        Ok(shape_resolved(&D::from(entity), &resolved))
    }
}

fn reject(err: QueryError) -> ServiceError {
    warn!("event=resource_validate module=service status=error error={err}");
    ServiceError::Validation(err)
}
