//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur in a capability backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The stored name cannot be used by this backend.
    #[error("invalid stored name: {0:?}")]
    InvalidName(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The backend refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
