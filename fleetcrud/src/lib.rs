//! Tenant-scoped CRUD building blocks for Axum and Sea-ORM services.
//!
//! Every resource implements [`CRUDResource`], which binds an API struct to its
//! sea-orm entity and pins every query to the caller's organization through a
//! [`Scope`]. [`CRUDOperations`] layers lifecycle hooks on top, and the
//! [`filtering`] module turns query parameters into sea-orm conditions.

pub mod cache;
pub mod core;
pub mod errors;
pub mod filtering;
pub mod operations;
pub mod validation;

pub use cache::{CacheKey, CachedQuery, Generation, QueryCache};
pub use core::{CRUDResource, MergeIntoActiveModel, Scope};
pub use errors::ApiError;
pub use filtering::{FilterOptions, apply_filters, calculate_content_range, parse_pagination, parse_sorting};
pub use operations::{CRUDOperations, DefaultCRUDOperations};
pub use validation::{Validatable, ValidationError, ValidationErrors};
