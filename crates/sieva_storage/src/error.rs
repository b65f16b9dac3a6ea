//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur at the storage boundaries.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The addressed row does not exist.
    #[error("row not found: id {id} in collection {collection}")]
    RowNotFound {
        /// Collection searched.
        collection: String,
        /// Identity that was not found.
        id: u64,
    },

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// The sink or store is closed.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Creates a row-not-found error.
    pub fn row_not_found(collection: impl Into<String>, id: u64) -> Self {
        Self::RowNotFound {
            collection: collection.into(),
            id,
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
