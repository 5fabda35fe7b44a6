//! # Stowage Store
//!
//! Capability interfaces and backends for Stowage ingestion.
//!
//! ## Overview
//!
//! The dedup coordinator consumes three capabilities, each an async trait:
//!
//! - [`ExistenceOracle`] - Is content for this descriptor already stored?
//! - [`MetadataStore`] - Look up or save the record describing stored content
//! - [`StorageWriter`] - Durably persist bytes under a stored name
//!
//! ## Backends
//!
//! - [`MemoryStorage`] / [`MemoryMetadataStore`] - In-memory, for tests
//! - [`FsStorage`] - Atomic writes under a root directory
//! - [`SqliteMetadataStore`] - Persistent [`FileRecord`]s in SQLite
//! - [`NoMetadata`] - No metadata layer; ingestion reports stored names only
//! - [`DeferToMetadata`] - An oracle that always defers to the metadata lookup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stowage_store::{FsStorage, SqliteMetadataStore};
//!
//! let storage = FsStorage::open("/var/lib/stowage/files").unwrap();
//! let metadata = SqliteMetadataStore::open("/var/lib/stowage/meta.db").unwrap();
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent saves**: saving a stored name twice returns the first record.
//! - **Atomic writes**: filesystem writes go through a temp file and rename.
//! - **Name hygiene**: stored names containing path separators are refused.
//! - **Choosing an oracle**: use the metadata store as the oracle whenever one
//!   is configured. Storage-backed oracles ([`FsStorage`], [`MemoryStorage`])
//!   report bytes orphaned by a failed save as present, and those uploads
//!   then never get a record.

pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod record;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use fs::FsStorage;
pub use memory::{MemoryMetadataStore, MemoryStorage};
pub use record::FileRecord;
pub use sqlite::SqliteMetadataStore;
pub use traits::{
    validate_stored_name, DeferToMetadata, ExistenceOracle, MetadataStore, NoMetadata,
    StorageWriter,
};
