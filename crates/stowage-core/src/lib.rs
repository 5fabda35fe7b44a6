//! # Stowage Core
//!
//! Pure primitives for Stowage, a content-addressed file ingestion service.
//!
//! This crate does no storage and no networking. Apart from the single
//! bounded payload read in [`fingerprint::read_bounded`], it is pure
//! computation over uploads and their outcomes.
//!
//! ## Key Types
//!
//! - [`Fingerprint`] - Blake3 content digest, the deduplication key
//! - [`ContentDescriptor`] - Everything known about one upload
//! - [`ExistenceVerdict`] - Tri-state answer from an existence oracle
//! - [`IngestionOutcome`] - Whether content was written or reused
//! - [`ResultEnvelope`] - The caller-facing outcome report
//! - [`IngestConfig`] - Per-call configuration snapshot
//!
//! ## Stored Names
//!
//! With hashing enabled, bytes are stored under `hex(fingerprint) + suffix`,
//! where the suffix is the original file extension. Without hashing, the
//! original name is used verbatim.

pub mod config;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod seal;
pub mod types;

pub use config::IngestConfig;
pub use descriptor::{suffix, ContentDescriptor, ExtraParams};
pub use envelope::ResultEnvelope;
pub use error::{CoreError, Result};
pub use fingerprint::{read_bounded, Fingerprint};
pub use seal::{FieldCipher, FieldSealer, Sealable, Sealer};
pub use types::{ExistenceVerdict, IngestionOutcome};
