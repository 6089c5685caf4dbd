//! Repository layer over SQLite.
//!
//! # Responsibility
//! - Offer one generic CRUD and paging contract for every `Entity`.
//! - Isolate SQL text and bind handling from service orchestration.
//!
//! # Invariants
//! - Soft-deleted rows stay hidden unless a caller opts in.
//! - Repository APIs return semantic errors (`NotFound`, `NotUnique`) in
//!   addition to DB transport errors.

pub mod async_repo;
pub mod filter;
pub mod repository;

pub use async_repo::AsyncRepository;
pub use filter::{Condition, Filter, FilterOp};
pub use repository::{PageQuery, RepoError, RepoResult, Repository, SqliteRepository};
