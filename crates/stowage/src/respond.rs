//! Turning ingestion results into caller-facing envelopes.

use stowage_core::{IngestConfig, IngestionOutcome, ResultEnvelope, Sealer};
use tracing::warn;

use crate::error::IngestError;

/// Build the envelope for an ingestion result.
///
/// A record, whether written or reused, becomes the envelope data. Without a
/// record the stored name is the message. Failures carry the configured
/// error code and a message naming the original file, never the cause.
///
/// When the config asks for sealing, data is only returned sealed: a
/// missing or failing sealer yields the failure envelope.
pub fn envelope_for<R>(
    result: Result<IngestionOutcome<R>, IngestError>,
    stored_name: Option<&str>,
    original_name: &str,
    config: &IngestConfig,
    sealer: Option<&dyn Sealer<R>>,
) -> ResultEnvelope<R> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(original_name, kind = ?e.kind(), error = %e, "upload failed");
            return failure(original_name, config);
        }
    };

    match outcome.into_record() {
        Some(mut record) => {
            if config.sealed {
                let Some(sealer) = sealer else {
                    warn!(original_name, "sealing requested but no sealer configured");
                    return failure(original_name, config);
                };
                if let Err(e) = sealer.seal(&mut record) {
                    warn!(original_name, error = %e, "sealing envelope data failed");
                    return failure(original_name, config);
                }
            }
            ResultEnvelope::ok_data(config.ok_code, config.ok_message.clone(), record)
        }
        None => ResultEnvelope::ok_message(config.ok_code, stored_name.unwrap_or(original_name)),
    }
}

/// The failure envelope for an upload of `original_name`.
pub fn failure<R>(original_name: &str, config: &IngestConfig) -> ResultEnvelope<R> {
    ResultEnvelope::error(config.error_code, format!("{} upload failed", original_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::{CoreError, FieldCipher};
    use stowage_store::{FileRecord, StoreError};

    fn record() -> FileRecord {
        FileRecord {
            fingerprint: None,
            stored_name: "a.txt".into(),
            original_name: "a.txt".into(),
            size_bytes: 1,
            extra_params: Default::default(),
            created_at: 0,
        }
    }

    struct Refuse;

    impl Sealer<FileRecord> for Refuse {
        fn seal(&self, _data: &mut FileRecord) -> stowage_core::Result<()> {
            Err(CoreError::Seal("no key".into()))
        }
    }

    #[test]
    fn test_record_becomes_data() {
        let env = envelope_for(
            Ok(IngestionOutcome::Written(Some(record()))),
            Some("a.txt"),
            "a.txt",
            &IngestConfig::default(),
            None,
        );
        assert!(env.is_success());
        assert_eq!(env.code, 200);
        assert_eq!(env.message, "request ok");
        assert_eq!(env.data, Some(record()));
    }

    #[test]
    fn test_missing_record_reports_stored_name() {
        let env: ResultEnvelope<FileRecord> = envelope_for(
            Ok(IngestionOutcome::Written(None)),
            Some("abcd.txt"),
            "a.txt",
            &IngestConfig::default(),
            None,
        );
        assert!(env.is_success());
        assert_eq!(env.message, "abcd.txt");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_failure_hides_cause() {
        let err = IngestError::Write {
            stored_name: "abcd.txt".into(),
            source: StoreError::Rejected("disk quota exceeded on /dev/sda1".into()),
        };
        let env: ResultEnvelope<FileRecord> =
            envelope_for(Err(err), None, "a.txt", &IngestConfig::default(), None);

        assert!(!env.is_success());
        assert_eq!(env.code, 400);
        assert_eq!(env.message, "a.txt upload failed");
    }

    #[test]
    fn test_sealed_when_configured() {
        let cipher = FieldCipher::generate();
        let config = IngestConfig::default().with_sealed(true);
        let env = envelope_for(
            Ok(IngestionOutcome::Reused(Some(record()))),
            Some("a.txt"),
            "a.txt",
            &config,
            Some(&cipher),
        );

        let data = env.data.unwrap();
        assert_ne!(data.original_name, "a.txt");
        assert_eq!(cipher.open_str(&data.original_name).unwrap(), "a.txt");
    }

    #[test]
    fn test_not_sealed_unless_configured() {
        let cipher = FieldCipher::generate();
        let env = envelope_for(
            Ok(IngestionOutcome::Reused(Some(record()))),
            Some("a.txt"),
            "a.txt",
            &IngestConfig::default(),
            Some(&cipher),
        );
        assert_eq!(env.data.unwrap().original_name, "a.txt");
    }

    #[test]
    fn test_seal_failure_becomes_failure_envelope() {
        let config = IngestConfig::default().with_sealed(true);
        let env = envelope_for(
            Ok(IngestionOutcome::Written(Some(record()))),
            Some("a.txt"),
            "a.txt",
            &config,
            Some(&Refuse),
        );
        assert!(!env.is_success());
        assert!(env.data.is_none());
    }

    #[test]
    fn test_sealed_without_sealer_fails_closed() {
        let config = IngestConfig::default().with_sealed(true);
        let env = envelope_for(
            Ok(IngestionOutcome::Written(Some(record()))),
            Some("a.txt"),
            "a.txt",
            &config,
            None,
        );

        assert!(!env.is_success());
        assert_eq!(env.code, 400);
        assert_eq!(env.message, "a.txt upload failed");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_sealed_without_record_still_reports_name() {
        let config = IngestConfig::default().with_sealed(true);
        let env: ResultEnvelope<FileRecord> = envelope_for(
            Ok(IngestionOutcome::Written(None)),
            Some("abcd.txt"),
            "a.txt",
            &config,
            None,
        );
        assert!(env.is_success());
        assert_eq!(env.message, "abcd.txt");
    }
}
