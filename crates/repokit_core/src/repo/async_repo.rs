//! Async facade over the SQLite repository.
//!
//! Each call locks the shared context and runs the synchronous repository
//! operation, or a stored-procedure call, on tokio's blocking pool.

use super::filter::Filter;
use super::repository::{PageQuery, RepoError, RepoResult, Repository, SqliteRepository};
use crate::db::{DataContext, DbResult, MultiResults, SharedDataContext};
use crate::mapping::MappingTable;
use crate::model::entity::Entity;
use crate::model::value::FieldValue;
use crate::query::paginated::PaginatedList;
use log::error;
use std::marker::PhantomData;
use std::sync::Arc;

/// Async repository handle. Cheap to clone.
pub struct AsyncRepository<T> {
    ctx: SharedDataContext,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for AsyncRepository<T> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            _entity: PhantomData,
        }
    }
}

impl<T> AsyncRepository<T>
where
    T: Entity + Send + Sync + 'static,
{
    /// Validates the entity schema once, then returns a handle that skips
    /// the check on every later call.
    pub async fn try_new(ctx: SharedDataContext) -> RepoResult<Self> {
        let handle = Self {
            ctx,
            _entity: PhantomData,
        };
        handle
            .run(|ctx| SqliteRepository::<T>::try_new(ctx).map(|_| ()))
            .await?;
        Ok(handle)
    }

    pub async fn get_single(&self, filter: Filter, show_deleted: bool) -> RepoResult<Option<T>> {
        self.run(move |ctx| {
            SqliteRepository::<T>::new_unchecked(ctx).get_single(&filter, show_deleted)
        })
        .await
    }

    pub async fn paginate(
        &self,
        query: PageQuery,
        table: Arc<MappingTable>,
    ) -> RepoResult<PaginatedList<T>> {
        self.run(move |ctx| SqliteRepository::<T>::new_unchecked(ctx).paginate(&query, &table))
            .await
    }

    pub async fn insert(&self, entity: T) -> RepoResult<usize> {
        self.run(move |ctx| SqliteRepository::<T>::new_unchecked(ctx).insert(&entity))
            .await
    }

    pub async fn insert_range(&self, entities: Vec<T>) -> RepoResult<usize> {
        self.run(move |ctx| SqliteRepository::<T>::new_unchecked(ctx).insert_range(&entities))
            .await
    }

    pub async fn update(&self, entity: T) -> RepoResult<usize> {
        self.run(move |ctx| SqliteRepository::<T>::new_unchecked(ctx).update(&entity))
            .await
    }

    pub async fn delete(&self, entity: T) -> RepoResult<usize> {
        self.run(move |ctx| SqliteRepository::<T>::new_unchecked(ctx).delete(&entity))
            .await
    }

    pub async fn delete_where(&self, filter: Filter) -> RepoResult<usize> {
        self.run(move |ctx| SqliteRepository::<T>::new_unchecked(ctx).delete_where(&filter))
            .await
    }

    /// Resolves `name` in the context's catalog, binds `parameters` and hands
    /// the result sets to `read`.
    ///
    /// The context stays locked until every statement of the procedure has
    /// run.
    pub async fn call_procedure<F, O>(
        &self,
        name: impl Into<String>,
        default_schema: bool,
        parameters: Vec<(String, FieldValue)>,
        read: F,
    ) -> RepoResult<O>
    where
        F: FnOnce(&mut MultiResults<'_>) -> DbResult<O> + Send + 'static,
        O: Send + 'static,
    {
        let name = name.into();
        self.run(move |ctx| {
            let command = parameters.into_iter().fold(
                ctx.stored_procedure(&name, default_schema)?,
                |command, (parameter, value)| command.with_parameter(&parameter, value),
            );
            let mut output = None;
            command.call_multi(|results| {
                output = Some(read(results)?);
                Ok(())
            })?;
            output.ok_or_else(|| {
                RepoError::Background(format!("procedure `{name}` produced no output"))
            })
        })
        .await
    }

    async fn run<F, O>(&self, op: F) -> RepoResult<O>
    where
        F: FnOnce(&DataContext) -> RepoResult<O> + Send + 'static,
        O: Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        let joined = tokio::task::spawn_blocking(move || {
            let guard = ctx
                .lock()
                .map_err(|_| RepoError::Background("data context mutex poisoned".to_string()))?;
            op(&guard)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    "event=repo_async module=repo status=error table={} error={}",
                    T::TABLE,
                    err
                );
                Err(RepoError::Background(err.to_string()))
            }
        }
    }
}
