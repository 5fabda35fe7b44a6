//! The Ingestor: the caller-facing upload API.
//!
//! Bundles the three capabilities, a shared [`DedupCoordinator`], and an
//! optional sealer, and turns raw uploads into envelopes.

use std::sync::Arc;

use bytes::Bytes;
use stowage_core::{
    read_bounded, ContentDescriptor, CoreError, ExtraParams, IngestConfig, IngestionOutcome,
    ResultEnvelope, Sealer,
};
use stowage_store::{ExistenceOracle, MetadataStore, StorageWriter};
use tokio::io::AsyncRead;
use tracing::{debug_span, field, Instrument, Span};

use crate::coordinator::DedupCoordinator;
use crate::error::Result;
use crate::respond;

/// Payloads larger than this are fingerprinted on the blocking pool.
const INLINE_HASH_LIMIT: usize = 64 * 1024;

/// One upload as handed over by the surrounding service.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub payload: Bytes,
    pub original_name: String,
    /// Derive the stored name from a fingerprint. Requires the full payload
    /// in memory; callers may decline for very large uploads.
    pub enable_hashing: bool,
    pub extra_params: ExtraParams,
}

impl IngestRequest {
    pub fn new(payload: impl Into<Bytes>, original_name: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            original_name: original_name.into(),
            enable_hashing: true,
            extra_params: ExtraParams::new(),
        }
    }

    pub fn hashing(mut self, enable: bool) -> Self {
        self.enable_hashing = enable;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, extra_params: ExtraParams) -> Self {
        self.extra_params = extra_params;
        self
    }

    /// Build the descriptor, fingerprinting the payload when hashing is on.
    pub fn describe(&self, config: &IngestConfig) -> Result<ContentDescriptor> {
        let size = self.payload.len() as u64;
        if size > config.max_upload_file_size {
            return Err(CoreError::PayloadTooLarge {
                size,
                limit: config.max_upload_file_size,
            }
            .into());
        }

        if self.enable_hashing {
            Ok(ContentDescriptor::hashed(
                self.original_name.clone(),
                &self.payload,
                self.extra_params.clone(),
            ))
        } else {
            Ok(ContentDescriptor::unhashed(
                self.original_name.clone(),
                size,
                self.extra_params.clone(),
            )?)
        }
    }
}

/// A completed ingestion: the descriptor it ran under and what happened.
#[derive(Debug, Clone)]
pub struct Ingestion<R> {
    pub descriptor: ContentDescriptor,
    pub outcome: IngestionOutcome<R>,
}

/// Upload entry point over a set of capabilities.
pub struct Ingestor<O, M, W>
where
    O: ExistenceOracle,
    M: MetadataStore,
    W: StorageWriter,
{
    oracle: Arc<O>,
    metadata: Arc<M>,
    writer: Arc<W>,
    coordinator: DedupCoordinator,
    sealer: Option<Arc<dyn Sealer<M::Record>>>,
}

impl<O, M, W> Clone for Ingestor<O, M, W>
where
    O: ExistenceOracle,
    M: MetadataStore,
    W: StorageWriter,
{
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            metadata: Arc::clone(&self.metadata),
            writer: Arc::clone(&self.writer),
            coordinator: self.coordinator.clone(),
            sealer: self.sealer.clone(),
        }
    }
}

impl<O, M, W> Ingestor<O, M, W>
where
    O: ExistenceOracle,
    M: MetadataStore,
    W: StorageWriter,
{
    pub fn new(oracle: O, metadata: M, writer: W) -> Self {
        Self::from_shared(Arc::new(oracle), Arc::new(metadata), Arc::new(writer))
    }

    /// Build over capabilities the caller also keeps handles to.
    ///
    /// Attempts are coordinated through [`DedupCoordinator::shared`], so
    /// any number of ingestors over the same backends never write the same
    /// stored name twice.
    pub fn from_shared(oracle: Arc<O>, metadata: Arc<M>, writer: Arc<W>) -> Self {
        Self {
            oracle,
            metadata,
            writer,
            coordinator: DedupCoordinator::shared(),
            sealer: None,
        }
    }

    /// Coordinate through `coordinator` instead of the process-wide one.
    ///
    /// Ingestors that share backends must also share a coordinator.
    pub fn with_coordinator(mut self, coordinator: DedupCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Seal envelope data with `sealer` when the config asks for it.
    pub fn with_sealer(mut self, sealer: Arc<dyn Sealer<M::Record>>) -> Self {
        self.sealer = Some(sealer);
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn coordinator(&self) -> &DedupCoordinator {
        &self.coordinator
    }

    /// Ingest an upload and report the outcome as an envelope.
    pub async fn ingest(
        &self,
        payload: impl Into<Bytes>,
        original_name: &str,
        enable_hashing: bool,
        extra_params: ExtraParams,
        config: &IngestConfig,
    ) -> ResultEnvelope<M::Record> {
        let request = IngestRequest::new(payload, original_name)
            .hashing(enable_hashing)
            .params(extra_params);
        self.respond(request, config).await
    }

    /// Ingest a prepared request and report the outcome as an envelope.
    pub async fn respond(
        &self,
        request: IngestRequest,
        config: &IngestConfig,
    ) -> ResultEnvelope<M::Record> {
        let span = ingest_span(&request.original_name, request.enable_hashing);
        self.respond_in_span(request, config).instrument(span).await
    }

    /// Read an upload from `reader` (at most the configured limit), then
    /// ingest it. A read failure fails the attempt before any coordination.
    pub async fn ingest_reader<R>(
        &self,
        reader: R,
        original_name: &str,
        enable_hashing: bool,
        extra_params: ExtraParams,
        config: &IngestConfig,
    ) -> ResultEnvelope<M::Record>
    where
        R: AsyncRead + Unpin + Send,
    {
        let span = ingest_span(original_name, enable_hashing);
        async {
            match read_bounded(reader, config.max_upload_file_size).await {
                Ok(payload) => {
                    let request = IngestRequest::new(payload, original_name)
                        .hashing(enable_hashing)
                        .params(extra_params);
                    self.respond_in_span(request, config).await
                }
                Err(e) => respond::envelope_for(Err(e.into()), None, original_name, config, None),
            }
        }
        .instrument(span)
        .await
    }

    /// Ingest an upload and return the typed result.
    pub async fn ingest_request(
        &self,
        request: IngestRequest,
        config: &IngestConfig,
    ) -> Result<Ingestion<M::Record>> {
        let span = ingest_span(&request.original_name, request.enable_hashing);
        self.run(request, config).instrument(span).await
    }

    async fn respond_in_span(
        &self,
        request: IngestRequest,
        config: &IngestConfig,
    ) -> ResultEnvelope<M::Record> {
        let original_name = request.original_name.clone();
        let (stored_name, outcome) = match self.run(request, config).await {
            Ok(ingestion) => (
                Some(ingestion.descriptor.stored_name().to_string()),
                Ok(ingestion.outcome),
            ),
            Err(e) => (None, Err(e)),
        };
        respond::envelope_for(
            outcome,
            stored_name.as_deref(),
            &original_name,
            config,
            self.sealer.as_deref(),
        )
    }

    async fn run(
        &self,
        request: IngestRequest,
        config: &IngestConfig,
    ) -> Result<Ingestion<M::Record>> {
        let descriptor = describe(&request, config).await?;

        let span = Span::current();
        span.record("stored_name", descriptor.stored_name());
        span.record("size_bytes", descriptor.size_bytes());

        let outcome = self
            .coordinator
            .ingest(
                &descriptor,
                &request.payload,
                self.oracle.as_ref(),
                self.metadata.as_ref(),
                self.writer.as_ref(),
                config,
            )
            .await?;

        Ok(Ingestion {
            descriptor,
            outcome,
        })
    }
}

/// The span every ingestion attempt runs in. Stored name and size are
/// recorded once the descriptor exists.
fn ingest_span(original_name: &str, hashed: bool) -> Span {
    debug_span!(
        "stowage.ingest",
        original_name,
        hashed,
        stored_name = field::Empty,
        size_bytes = field::Empty,
    )
}

/// Build the descriptor, hashing large payloads off the async workers.
async fn describe(request: &IngestRequest, config: &IngestConfig) -> Result<ContentDescriptor> {
    if !request.enable_hashing || request.payload.len() <= INLINE_HASH_LIMIT {
        return request.describe(config);
    }

    let request = request.clone();
    let config = config.clone();
    tokio::task::spawn_blocking(move || request.describe(&config)).await?
}
