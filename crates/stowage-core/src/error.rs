//! Error types for Stowage Core.

use thiserror::Error;

/// Errors raised while building descriptors, reading payloads, or sealing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The payload could not be read in full.
    #[error("payload read failed: {0}")]
    Read(#[from] std::io::Error),

    /// The payload exceeds the configured upload limit.
    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// No usable stored name could be derived.
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("sealing failed: {0}")]
    Seal(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
