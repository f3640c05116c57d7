//! Error types for the audited collection engine
//!
//! Every failure on the write path aborts the enclosing transaction and is
//! surfaced through `SyncError`. A parent without children is not an error:
//! loaders return an empty collection instead.

use thiserror::Error;

/// The main error type for collection synchronization
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Malformed identifier, missing required field, or mismatched parent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A live-table constraint rejected a write
    #[error("Constraint violation on {table}: {detail}")]
    ConstraintViolation { table: String, detail: String },

    /// A single row write failed inside a unit of work
    #[error("Write failed on {table}: {detail}")]
    WriteFailure { table: String, detail: String },

    /// Commit or rollback of the unit of work failed
    #[error("Transaction failure: {0}")]
    TransactionFailure(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Another handle holds the store's lock file
    #[error("Store is locked by another process: {0}")]
    StoreLocked(String),
}

impl SyncError {
    /// Create an invalid input error
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    /// Create a constraint violation error for a table
    pub fn constraint(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Create a write failure error for a table
    pub fn write_failure(table: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::WriteFailure {
            table: table.into(),
            detail: detail.into(),
        }
    }

    /// Check if this is an invalid input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    /// Check if the store was already opened elsewhere
    pub fn is_store_locked(&self) -> bool {
        matches!(self, Self::StoreLocked(_))
    }

    /// Check if this error happened while writing rows or committing
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Self::WriteFailure { .. } | Self::ConstraintViolation { .. } | Self::TransactionFailure(_)
        )
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for collection operations
pub type SyncResult<T> = Result<T, SyncError>;
