//! # Stowage
//!
//! Content-addressed file ingestion with concurrency-safe deduplication.
//!
//! ## Overview
//!
//! An upload is fingerprinted, named by its fingerprint, and written to
//! storage only if that content is not already there. Concurrent uploads of
//! identical content produce exactly one write; every caller gets back an
//! envelope naming the same stored file.
//!
//! - **Descriptors**: a fingerprint-derived stored name plus caller metadata
//! - **Coordination**: decide-and-commit runs under a per-name lock
//! - **Capabilities**: oracle, metadata store, and writer are pluggable
//! - **Envelopes**: every attempt ends in a success or failure report
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stowage::{IngestConfig, Ingestor};
//! use stowage::core::ExtraParams;
//! use stowage::store::{FsStorage, SqliteMetadataStore};
//!
//! async fn example() {
//!     let storage = FsStorage::open("/var/lib/stowage/files").unwrap();
//!     let metadata = SqliteMetadataStore::open("/var/lib/stowage/meta.db").unwrap();
//!
//!     let ingestor = Ingestor::new(metadata.clone(), metadata, storage);
//!     let config = IngestConfig::default();
//!
//!     let envelope = ingestor
//!         .ingest(&b"hello"[..], "hello.txt", true, ExtraParams::new(), &config)
//!         .await;
//!     assert!(envelope.is_success());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `stowage::core` - Fingerprints, descriptors, envelopes, config
//! - `stowage::store` - Capability traits and backends

pub mod coordinator;
pub mod error;
pub mod ingestor;
pub mod locks;
pub mod respond;

pub use stowage_core as core;
pub use stowage_store as store;

pub use coordinator::DedupCoordinator;
pub use error::{FailureKind, IngestError, Result};
pub use ingestor::{IngestRequest, Ingestion, Ingestor};
pub use locks::{KeyedGuard, KeyedLocks};

pub use stowage_core::{
    ContentDescriptor, ExistenceVerdict, Fingerprint, IngestConfig, IngestionOutcome,
    ResultEnvelope,
};
