//! Verdicts and outcomes exchanged between the coordinator and its callers.

use serde::{Deserialize, Serialize};

/// Answer from an existence oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExistenceVerdict {
    /// The oracle cannot answer cheaply; fall back to a metadata lookup.
    Unknown,
    /// Content for this descriptor is already stored.
    Present,
    /// Content for this descriptor is not stored.
    Absent,
}

impl From<Option<bool>> for ExistenceVerdict {
    fn from(answer: Option<bool>) -> Self {
        match answer {
            None => ExistenceVerdict::Unknown,
            Some(true) => ExistenceVerdict::Present,
            Some(false) => ExistenceVerdict::Absent,
        }
    }
}

impl From<bool> for ExistenceVerdict {
    fn from(present: bool) -> Self {
        Some(present).into()
    }
}

/// What an ingestion attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome<R> {
    /// Content already existed; nothing was written or saved.
    ///
    /// The record is `None` when the oracle reported the content present
    /// but the metadata store holds no record for it.
    Reused(Option<R>),
    /// Bytes were written and the descriptor saved.
    ///
    /// The record is `None` when no metadata layer is in play; the stored
    /// name is then the canonical reference.
    Written(Option<R>),
}

impl<R> IngestionOutcome<R> {
    pub fn is_written(&self) -> bool {
        matches!(self, IngestionOutcome::Written(_))
    }

    pub fn is_reused(&self) -> bool {
        matches!(self, IngestionOutcome::Reused(_))
    }

    pub fn record(&self) -> Option<&R> {
        match self {
            IngestionOutcome::Reused(r) | IngestionOutcome::Written(r) => r.as_ref(),
        }
    }

    pub fn into_record(self) -> Option<R> {
        match self {
            IngestionOutcome::Reused(r) | IngestionOutcome::Written(r) => r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_tristate() {
        assert_eq!(ExistenceVerdict::from(None), ExistenceVerdict::Unknown);
        assert_eq!(ExistenceVerdict::from(Some(true)), ExistenceVerdict::Present);
        assert_eq!(ExistenceVerdict::from(false), ExistenceVerdict::Absent);
    }

    #[test]
    fn test_outcome_accessors() {
        let written: IngestionOutcome<u32> = IngestionOutcome::Written(Some(7));
        assert!(written.is_written());
        assert_eq!(written.record(), Some(&7));

        let reused: IngestionOutcome<u32> = IngestionOutcome::Reused(None);
        assert!(reused.is_reused());
        assert_eq!(reused.into_record(), None);
    }
}
