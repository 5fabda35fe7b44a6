//! The dedup coordinator: decide-and-commit under per-name exclusion.
//!
//! A naive "exists? then write" sequence lets two attempts for the same
//! content both see it absent and both write. The coordinator runs the
//! existence decision and the resulting write/save inside one critical
//! section keyed by stored name, so at most one attempt per stored name is
//! deciding at any time, while attempts for different names run in parallel.

use std::sync::OnceLock;

use bytes::Bytes;
use stowage_core::{ContentDescriptor, ExistenceVerdict, IngestConfig, IngestionOutcome};
use stowage_store::{ExistenceOracle, MetadataStore, StorageWriter};
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::locks::KeyedLocks;

/// What the coordinator decided inside the critical section.
enum Decision<R> {
    Reuse(Option<R>),
    Write,
}

/// Serializes ingestion attempts per stored name.
///
/// Cheap to clone; clones share the same lock table.
#[derive(Debug, Clone, Default)]
pub struct DedupCoordinator {
    locks: KeyedLocks,
}

static PROCESS: OnceLock<DedupCoordinator> = OnceLock::new();

impl DedupCoordinator {
    /// A coordinator with its own, private lock table.
    ///
    /// Only attempts made through it (or its clones) exclude each other.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide coordinator.
    ///
    /// Every caller shares one lock table, so ingestors built separately
    /// over the same backends still serialize attempts per stored name.
    pub fn shared() -> Self {
        PROCESS.get_or_init(DedupCoordinator::new).clone()
    }

    /// The lock table, for inspection.
    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Ingest `payload` described by `descriptor`.
    ///
    /// Writes the bytes and saves the descriptor only when the content is
    /// not already present, and always writes before saving: a failed write
    /// never reaches the metadata store. A failed save leaves the written
    /// bytes in place. Exclusion is released on every path.
    pub async fn ingest<O, M, W>(
        &self,
        descriptor: &ContentDescriptor,
        payload: &Bytes,
        oracle: &O,
        metadata: &M,
        writer: &W,
        config: &IngestConfig,
    ) -> Result<IngestionOutcome<M::Record>>
    where
        O: ExistenceOracle + ?Sized,
        M: MetadataStore + ?Sized,
        W: StorageWriter + ?Sized,
    {
        let stored_name = descriptor.stored_name();
        let _guard = self.locks.acquire(stored_name).await;

        match self.decide(descriptor, oracle, metadata, config).await? {
            Decision::Reuse(record) => {
                debug!(stored_name, has_record = record.is_some(), "reusing existing content");
                Ok(IngestionOutcome::Reused(record))
            }
            Decision::Write => {
                writer
                    .write(payload, stored_name)
                    .await
                    .map_err(|source| {
                        warn!(stored_name, error = %source, "storage write failed");
                        IngestError::Write {
                            stored_name: stored_name.to_string(),
                            source,
                        }
                    })?;
                info!(stored_name, size_bytes = descriptor.size_bytes(), "wrote new content");

                let record = metadata.save(descriptor).await.map_err(|source| {
                    warn!(stored_name, error = %source, "metadata save failed; bytes left on storage");
                    IngestError::Save {
                        stored_name: stored_name.to_string(),
                        source,
                    }
                })?;
                Ok(IngestionOutcome::Written(record))
            }
        }
    }

    async fn decide<O, M>(
        &self,
        descriptor: &ContentDescriptor,
        oracle: &O,
        metadata: &M,
        config: &IngestConfig,
    ) -> Result<Decision<M::Record>>
    where
        O: ExistenceOracle + ?Sized,
        M: MetadataStore + ?Sized,
    {
        let verdict = oracle
            .exists(descriptor)
            .await
            .map_err(|source| lookup_error(descriptor, source))?;
        debug!(stored_name = descriptor.stored_name(), ?verdict, "existence verdict");

        match verdict {
            ExistenceVerdict::Absent => Ok(Decision::Write),
            ExistenceVerdict::Present => Ok(Decision::Reuse(find(descriptor, metadata).await?)),
            ExistenceVerdict::Unknown => {
                let mut found = find(descriptor, metadata).await?;
                if found.is_none() && config.recheck_unknown_miss {
                    found = find(descriptor, metadata).await?;
                }
                Ok(match found {
                    Some(record) => Decision::Reuse(Some(record)),
                    None => Decision::Write,
                })
            }
        }
    }
}

async fn find<M>(descriptor: &ContentDescriptor, metadata: &M) -> Result<Option<M::Record>>
where
    M: MetadataStore + ?Sized,
{
    metadata
        .find_by_descriptor(descriptor)
        .await
        .map_err(|source| lookup_error(descriptor, source))
}

fn lookup_error(descriptor: &ContentDescriptor, source: stowage_store::StoreError) -> IngestError {
    warn!(stored_name = descriptor.stored_name(), error = %source, "existence lookup failed");
    IngestError::Lookup {
        stored_name: descriptor.stored_name().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use stowage_core::ExtraParams;
    use stowage_store::{DeferToMetadata, MemoryMetadataStore, MemoryStorage, NoMetadata};

    fn hashed(name: &str, data: &'static [u8]) -> (ContentDescriptor, Bytes) {
        (
            ContentDescriptor::hashed(name, data, ExtraParams::new()),
            Bytes::from_static(data),
        )
    }

    #[tokio::test]
    async fn test_absent_writes_and_saves() {
        let coordinator = DedupCoordinator::new();
        let storage = MemoryStorage::new();
        let metadata = MemoryMetadataStore::new();
        let (d, bytes) = hashed("a.txt", b"alpha");

        let outcome = coordinator
            .ingest(&d, &bytes, &storage, &metadata, &storage, &IngestConfig::default())
            .await
            .unwrap();

        assert!(outcome.is_written());
        assert_eq!(outcome.record().unwrap().stored_name, d.stored_name());
        assert!(storage.contains(d.stored_name()));
        assert!(coordinator.locks().is_empty());
    }

    #[tokio::test]
    async fn test_present_reuses_without_writing() {
        let coordinator = DedupCoordinator::new();
        let storage = MemoryStorage::new();
        let metadata = MemoryMetadataStore::new();
        let (d, bytes) = hashed("a.txt", b"alpha");
        let config = IngestConfig::default();

        coordinator
            .ingest(&d, &bytes, &metadata, &metadata, &storage, &config)
            .await
            .unwrap();
        let again = coordinator
            .ingest(&d, &bytes, &metadata, &metadata, &storage, &config)
            .await
            .unwrap();

        assert!(again.is_reused());
        assert_eq!(again.record().unwrap().stored_name, d.stored_name());
        assert_eq!(metadata.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_falls_back_to_lookup() {
        let coordinator = DedupCoordinator::new();
        let storage = MemoryStorage::new();
        let metadata = MemoryMetadataStore::new();
        let (d, bytes) = hashed("b.bin", b"beta");
        let config = IngestConfig::default();

        let first = coordinator
            .ingest(&d, &bytes, &DeferToMetadata, &metadata, &storage, &config)
            .await
            .unwrap();
        let second = coordinator
            .ingest(&d, &bytes, &DeferToMetadata, &metadata, &storage, &config)
            .await
            .unwrap();

        assert!(first.is_written());
        assert!(second.is_reused());
    }

    #[tokio::test]
    async fn test_present_without_record_reuses_bare() {
        let coordinator = DedupCoordinator::new();
        let storage = MemoryStorage::new();
        let (d, bytes) = hashed("c.dat", b"gamma");
        storage.write(&bytes, d.stored_name()).await.unwrap();

        let outcome = coordinator
            .ingest(&d, &bytes, &storage, &NoMetadata, &storage, &IngestConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome, IngestionOutcome::Reused(None));
    }

    #[tokio::test]
    async fn test_no_metadata_written_without_record() {
        let coordinator = DedupCoordinator::new();
        let storage = MemoryStorage::new();
        let (d, bytes) = hashed("c.dat", b"gamma");

        let outcome = coordinator
            .ingest(&d, &bytes, &DeferToMetadata, &NoMetadata, &storage, &IngestConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome, IngestionOutcome::Written(None));
        assert!(storage.contains(d.stored_name()));
    }

    #[tokio::test]
    async fn test_write_failure_skips_save_and_releases() {
        let coordinator = DedupCoordinator::new();
        let storage = MemoryStorage::new();
        let metadata = MemoryMetadataStore::new();
        let d = ContentDescriptor::unhashed("..", 3, ExtraParams::new()).unwrap();

        let err = coordinator
            .ingest(
                &d,
                &Bytes::from_static(b"abc"),
                &DeferToMetadata,
                &metadata,
                &storage,
                &IngestConfig::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::WriteFailure);
        assert!(metadata.is_empty());
        assert!(coordinator.locks().is_empty());
    }

    #[tokio::test]
    async fn test_shared_coordinators_share_locks() {
        let key = "shared-coordinator-test.key";
        let held = DedupCoordinator::shared().locks().acquire(key).await;

        let other = DedupCoordinator::shared();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), other.locks().acquire(key)).await;
        assert!(blocked.is_err());

        drop(held);
        let acquired =
            tokio::time::timeout(Duration::from_millis(200), other.locks().acquire(key)).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_new_coordinators_are_isolated() {
        let a = DedupCoordinator::new();
        let b = DedupCoordinator::new();
        let _held = a.locks().acquire("k").await;

        let other = tokio::time::timeout(Duration::from_millis(200), b.locks().acquire("k")).await;
        assert!(other.is_ok());
    }

    proptest! {
        #[test]
        fn test_one_write_per_distinct_payload(
            uploads in prop::collection::vec((0u8..4, "[a-z]{1,6}\\.(txt|bin)"), 1..24),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let coordinator = DedupCoordinator::new();
            let storage = MemoryStorage::new();
            let metadata = MemoryMetadataStore::new();
            let config = IngestConfig::default();

            let mut written = HashSet::new();
            for (content, name) in &uploads {
                let payload = Bytes::from(vec![*content; 8]);
                let d = ContentDescriptor::hashed(name.as_str(), &payload, ExtraParams::new());
                let outcome = runtime
                    .block_on(coordinator.ingest(&d, &payload, &metadata, &metadata, &storage, &config))
                    .unwrap();

                let first_time = written.insert(d.stored_name().to_string());
                prop_assert_eq!(outcome.is_written(), first_time);
            }

            prop_assert_eq!(storage.len(), written.len());
            prop_assert_eq!(metadata.len(), written.len());
            prop_assert!(coordinator.locks().is_empty());
        }
    }
}
