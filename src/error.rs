//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Failures reported by the document-store collaborator.
///
/// `Clone` so a single failed fetch can be handed to every task waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Document does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time
    #[error("Store timeout: {0}")]
    Timeout(String),

    /// Query rejected by the backend
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    // == Is Retryable ==
    /// Returns true for transient failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

// == Cache Error Enum ==
/// Unified error type for the crate's fallible operations.
///
/// Plain cache reads and writes never fail; these errors come from the
/// collaborator, payload (de)serialization or setup.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Document-store failure during a miss-triggered fetch
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cached payload could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Rejected configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Logging could not be initialised
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
