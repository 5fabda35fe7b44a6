//! Test fixtures and instrumented capabilities.
//!
//! The wrappers delegate to a real backend and record how often each
//! capability was invoked, so tests can assert on write/save counts.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use stowage::core::ExtraParams;
use stowage::store::{
    ExistenceOracle, FileRecord, MemoryMetadataStore, MemoryStorage, MetadataStore, StorageWriter,
    StoreError,
};
use stowage::{
    ContentDescriptor, DedupCoordinator, ExistenceVerdict, IngestConfig, Ingestor, ResultEnvelope,
};
use tracing_subscriber::filter::LevelFilter;

/// Install a test-writer subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}

/// A storage writer that counts calls and can be slowed down or broken.
pub struct CountingWriter<W> {
    inner: W,
    writes: AtomicUsize,
    delay_ms: AtomicU64,
    fail: AtomicBool,
}

impl<W> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            delay_ms: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Sleep this long inside every write, widening race windows.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of write calls, failed ones included.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait]
impl<W: StorageWriter> StorageWriter for CountingWriter<W> {
    async fn write(&self, bytes: &Bytes, stored_name: &str) -> stowage::store::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(format!("injected write failure for {stored_name}")));
        }
        self.inner.write(bytes, stored_name).await
    }
}

#[async_trait]
impl<W: StorageWriter + ExistenceOracle> ExistenceOracle for CountingWriter<W> {
    async fn exists(&self, descriptor: &ContentDescriptor) -> stowage::store::Result<ExistenceVerdict> {
        self.inner.exists(descriptor).await
    }
}

/// A metadata store that counts lookups and saves, and can fail saves.
pub struct CountingMetadata<M> {
    inner: M,
    finds: AtomicUsize,
    saves: AtomicUsize,
    checks: AtomicUsize,
    fail_saves: AtomicBool,
}

impl<M> CountingMetadata<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            checks: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of save calls, failed ones included.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Number of existence checks answered.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: MetadataStore> MetadataStore for CountingMetadata<M> {
    type Record = M::Record;

    async fn find_by_descriptor(
        &self,
        descriptor: &ContentDescriptor,
    ) -> stowage::store::Result<Option<M::Record>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_descriptor(descriptor).await
    }

    async fn save(&self, descriptor: &ContentDescriptor) -> stowage::store::Result<Option<M::Record>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected(format!(
                "injected save failure for {}",
                descriptor.stored_name()
            )));
        }
        self.inner.save(descriptor).await
    }
}

#[async_trait]
impl<M: ExistenceOracle> ExistenceOracle for CountingMetadata<M> {
    async fn exists(&self, descriptor: &ContentDescriptor) -> stowage::store::Result<ExistenceVerdict> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(descriptor).await
    }
}

/// An oracle with a fixed answer, or none (lookup failure).
pub struct ScriptedOracle {
    verdict: Mutex<Option<ExistenceVerdict>>,
    checks: AtomicUsize,
}

impl ScriptedOracle {
    pub fn answering(verdict: ExistenceVerdict) -> Self {
        Self {
            verdict: Mutex::new(Some(verdict)),
            checks: AtomicUsize::new(0),
        }
    }

    /// An oracle whose every check fails as unreachable.
    pub fn failing() -> Self {
        Self {
            verdict: Mutex::new(None),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, verdict: Option<ExistenceVerdict>) {
        *self.verdict.lock().unwrap_or_else(PoisonError::into_inner) = verdict;
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExistenceOracle for ScriptedOracle {
    async fn exists(&self, _descriptor: &ContentDescriptor) -> stowage::store::Result<ExistenceVerdict> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let verdict = *self.verdict.lock().unwrap_or_else(PoisonError::into_inner);
        verdict.ok_or_else(|| StoreError::Rejected("oracle unreachable".into()))
    }
}

/// Metadata store doubling as the oracle, both instrumented.
pub type Metadata = CountingMetadata<MemoryMetadataStore>;
/// Storage writer, instrumented.
pub type Storage = CountingWriter<MemoryStorage>;
/// The ingestor a [`TestFixture`] drives.
pub type MemoryIngestor = Ingestor<Metadata, Metadata, Storage>;

/// An in-memory ingestor with handles on its instrumented capabilities.
pub struct TestFixture {
    pub metadata: Arc<Metadata>,
    pub storage: Arc<Storage>,
    pub ingestor: MemoryIngestor,
    pub config: IngestConfig,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_storage(CountingWriter::new(MemoryStorage::new()))
    }

    /// Build around a preconfigured writer (delays, failures).
    pub fn with_storage(storage: Storage) -> Self {
        let metadata = Arc::new(CountingMetadata::new(MemoryMetadataStore::new()));
        let storage = Arc::new(storage);
        // Private lock table: lock assertions must not see other tests' keys.
        let ingestor =
            Ingestor::from_shared(Arc::clone(&metadata), Arc::clone(&metadata), Arc::clone(&storage))
                .with_coordinator(DedupCoordinator::new());
        Self {
            metadata,
            storage,
            ingestor,
            config: IngestConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Upload `payload` with hashing enabled.
    pub async fn upload(&self, payload: &[u8], original_name: &str) -> ResultEnvelope<FileRecord> {
        self.ingestor
            .ingest(
                Bytes::copy_from_slice(payload),
                original_name,
                true,
                ExtraParams::new(),
                &self.config,
            )
            .await
    }

    /// Upload `payload` stored under its original name.
    pub async fn upload_unhashed(
        &self,
        payload: &[u8],
        original_name: &str,
    ) -> ResultEnvelope<FileRecord> {
        self.ingestor
            .ingest(
                Bytes::copy_from_slice(payload),
                original_name,
                false,
                ExtraParams::new(),
                &self.config,
            )
            .await
    }

    /// Number of distinct blobs on storage.
    pub fn stored_files(&self) -> usize {
        self.storage.inner().len()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_upload_counts() {
        let fixture = TestFixture::new();
        let env = fixture.upload(b"hello", "hello.txt").await;

        assert!(env.is_success());
        assert_eq!(fixture.storage.writes(), 1);
        assert_eq!(fixture.metadata.saves(), 1);
        assert_eq!(fixture.metadata.checks(), 1);
        assert_eq!(fixture.stored_files(), 1);
    }

    #[tokio::test]
    async fn test_failing_writer_counts_attempt() {
        let writer = CountingWriter::new(MemoryStorage::new());
        writer.fail_writes(true);

        let err = writer.write(&Bytes::from_static(b"x"), "x.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(writer.writes(), 1);
        assert!(writer.inner().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_oracle() {
        let oracle = ScriptedOracle::answering(ExistenceVerdict::Unknown);
        let d = ContentDescriptor::hashed("a", b"a", ExtraParams::new());

        assert_eq!(oracle.exists(&d).await.unwrap(), ExistenceVerdict::Unknown);
        oracle.set(None);
        assert!(oracle.exists(&d).await.is_err());
        assert_eq!(oracle.checks(), 2);
    }
}
