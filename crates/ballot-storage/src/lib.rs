//! Storage abstraction for ballot.
//!
//! Backend crates (e.g., ballot-store-sqlite) implement the [`Store`] trait so
//! `ballot-core` doesn't depend on any specific database engine or schema details.
//! The membership transition table and the approval rule live here as well, so the
//! services and the backends read them from a single place.

use thiserror::Error;

mod store;
pub mod types;

pub use store::*;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
