//! Error types for engine operations.

use sieva_storage::StorageError;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the lifecycle engine, the compilers, and the export
/// pipeline.
///
/// All variants are synchronous: they surface to the immediate caller of
/// the operation that detected them. Background hook failures are never
/// converted into errors; they are logged and swallowed.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage boundary error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The request was malformed (missing id, empty payload).
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// A unique field collided with a different existing row.
    #[error("duplicate value for field {field}: {value}")]
    DuplicateValue {
        /// The unique field that collided.
        field: String,
        /// The offending value, rendered as text.
        value: String,
    },

    /// No matching row (or the row is soft-deleted).
    #[error("entity not found: id {id} in collection {collection}")]
    NotFound {
        /// Collection searched.
        collection: String,
        /// Identity that was not found.
        id: u64,
    },

    /// The operation is disallowed in the entity's current state.
    #[error("operation forbidden: {message}")]
    Forbidden {
        /// Why the operation is disallowed.
        message: String,
    },

    /// A lock could not be acquired within its timeout.
    #[error("system busy: lock {key} not acquired within timeout")]
    Busy {
        /// The contended lock key.
        key: String,
    },

    /// An export job was polled before completion.
    #[error("export {code} is not ready")]
    NotReady {
        /// The job's opaque code.
        code: String,
    },

    /// An export job code is unknown (expired or never issued).
    #[error("export {code} is unknown")]
    UnknownExport {
        /// The unrecognized code.
        code: String,
    },
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a duplicate-value error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(collection: impl Into<String>, id: u64) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id,
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a busy error.
    pub fn busy(key: impl Into<String>) -> Self {
        Self::Busy { key: key.into() }
    }
}
