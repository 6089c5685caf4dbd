//! Field registry and value model shared by every layer.
//!
//! # Responsibility
//! - Define how entity and DTO types expose their fields without reflection.
//! - Define the loosely-typed value union used for shaping and SQL binding.
//!
//! # Invariants
//! - Field lists are static and declared once per type.
//! - Deletion is represented by soft-delete tombstones unless an entity opts out.

pub mod entity;
pub mod value;
