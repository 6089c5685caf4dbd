//! Use-case services.
//!
//! # Responsibility
//! - Turn caller requests into validated repository calls.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod resource_service;

pub use resource_service::{
    ResourceRequest, ResourceService, ServiceError, ServiceResult, DEFAULT_PAGE_SIZE,
};
