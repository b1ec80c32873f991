//! Error types for the value layer.

use crate::types::ObjectId;
use thiserror::Error;

/// Result type alias for value-layer operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the value layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// A byte source failed after committing to supply its bytes.
    ///
    /// Deliberately carries no cause: the failure is a signal to the data
    /// consumer, and whoever owns the source communicates the reason
    /// out-of-band.
    #[error("byte source failed")]
    ProviderFailed,

    /// A segmented-object locator did not resolve to a live object
    #[error("segmented object {0} not found")]
    ObjectNotFound(ObjectId),

    /// Invalid operation for the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl StorageError {
    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Whether this error is a byte-source failure (recoverable by rollback)
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderFailed)
    }
}
