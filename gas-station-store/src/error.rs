//! Repository error types.

use gas_station_core::HttpError;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document matched.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A document with the same `_id` already exists.
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// Malformed filter, update, projection or pipeline.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => HttpError::not_found(err.to_string()),
            StoreError::Duplicate(_) => HttpError::conflict(err.to_string()),
            StoreError::InvalidQuery(_) => HttpError::bad_request(err.to_string()),
            StoreError::Backend(_) | StoreError::Serialization(_) => {
                HttpError::internal(err.to_string())
            }
        }
    }
}
