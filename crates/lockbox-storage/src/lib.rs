//! Storage abstraction for lockbox.
//!
//! Backend crates (e.g., lockbox-store-memory, lockbox-store-sqlite)
//! implement the [`SecretStore`] trait so lockbox-core doesn't depend on any
//! specific database engine or schema details.
//!
//! All queries are **scoped by organization**: a record stored under one
//! organization is indistinguishable from a nonexistent record when queried
//! under another.

mod store;
mod types;

pub use store::SecretStore;
#[cfg(feature = "test-support")]
pub use store::MockSecretStore;
pub use types::*;

use thiserror::Error;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id in this organization. Cross-organization
    /// lookups land here too, so callers cannot probe for existence.
    #[error("not found")]
    NotFound,
    /// Identity collision on insert. Should not occur under v7 generation.
    #[error("conflict")]
    Conflict,
    /// A patch tried to change `kind` or `organization_id`.
    #[error("immutable field in patch")]
    ImmutableField,
    #[error("backend error: {0}")]
    Backend(String),
}
