//! Error types for ingestion.

use stowage_core::CoreError;
use stowage_store::StoreError;
use thiserror::Error;

/// Failure categories reported for an ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Payload unreadable, or hashing failed.
    ReadFailure,
    /// Storage write rejected or failed.
    WriteFailure,
    /// Metadata persistence rejected or failed.
    SaveFailure,
    /// Oracle or metadata store unreachable.
    LookupFailure,
    /// Input refused before coordination (oversized, unusable name).
    Rejected,
}

/// Errors that can occur during an ingestion attempt.
///
/// All are terminal for the attempt; none are retried internally.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("payload read failed: {0}")]
    Read(#[source] CoreError),

    #[error("upload rejected: {0}")]
    Rejected(#[source] CoreError),

    #[error("storage write failed for {stored_name}: {source}")]
    Write {
        stored_name: String,
        #[source]
        source: StoreError,
    },

    #[error("metadata save failed for {stored_name}: {source}")]
    Save {
        stored_name: String,
        #[source]
        source: StoreError,
    },

    #[error("fingerprinting task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("existence lookup failed for {stored_name}: {source}")]
    Lookup {
        stored_name: String,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::Read(_) | IngestError::Task(_) => FailureKind::ReadFailure,
            IngestError::Rejected(_) => FailureKind::Rejected,
            IngestError::Write { .. } => FailureKind::WriteFailure,
            IngestError::Save { .. } => FailureKind::SaveFailure,
            IngestError::Lookup { .. } => FailureKind::LookupFailure,
        }
    }
}

impl From<CoreError> for IngestError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Read(_) => IngestError::Read(e),
            _ => IngestError::Rejected(e),
        }
    }
}

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_classify() {
        let read: IngestError =
            CoreError::Read(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof")).into();
        assert_eq!(read.kind(), FailureKind::ReadFailure);

        let too_big: IngestError = CoreError::PayloadTooLarge { size: 10, limit: 5 }.into();
        assert_eq!(too_big.kind(), FailureKind::Rejected);
    }

    #[test]
    fn test_store_errors_keep_stored_name() {
        let err = IngestError::Write {
            stored_name: "abc.txt".into(),
            source: StoreError::Rejected("disk full".into()),
        };
        assert_eq!(err.kind(), FailureKind::WriteFailure);
        assert!(err.to_string().contains("abc.txt"));
    }
}
