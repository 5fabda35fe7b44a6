//! Capability traits consumed by the dedup coordinator.
//!
//! The coordinator is storage-agnostic: it needs an existence check, a
//! metadata lookup/save pair, and a byte writer. Implementations include
//! in-memory, filesystem, and SQLite backends.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{ContentDescriptor, ExistenceVerdict};

use crate::error::Result;

/// Answers whether content for a descriptor is already stored.
#[async_trait]
pub trait ExistenceOracle: Send + Sync {
    /// Return `Unknown` when the answer is not cheap; the coordinator then
    /// falls back to a metadata lookup.
    async fn exists(&self, descriptor: &ContentDescriptor) -> Result<ExistenceVerdict>;
}

/// Persists and retrieves records describing stored content.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// The persisted record type.
    type Record: Clone + Send + Sync + 'static;

    /// Look up the record for a descriptor's content.
    async fn find_by_descriptor(
        &self,
        descriptor: &ContentDescriptor,
    ) -> Result<Option<Self::Record>>;

    /// Persist a record for newly written content.
    ///
    /// Returns `None` when no metadata persistence is configured.
    async fn save(&self, descriptor: &ContentDescriptor) -> Result<Option<Self::Record>>;
}

/// Durably persists bytes under a stored name.
#[async_trait]
pub trait StorageWriter: Send + Sync {
    async fn write(&self, bytes: &Bytes, stored_name: &str) -> Result<()>;
}

#[async_trait]
impl<T: ExistenceOracle + ?Sized> ExistenceOracle for Arc<T> {
    async fn exists(&self, descriptor: &ContentDescriptor) -> Result<ExistenceVerdict> {
        (**self).exists(descriptor).await
    }
}

#[async_trait]
impl<T: MetadataStore + ?Sized> MetadataStore for Arc<T> {
    type Record = T::Record;

    async fn find_by_descriptor(
        &self,
        descriptor: &ContentDescriptor,
    ) -> Result<Option<Self::Record>> {
        (**self).find_by_descriptor(descriptor).await
    }

    async fn save(&self, descriptor: &ContentDescriptor) -> Result<Option<Self::Record>> {
        (**self).save(descriptor).await
    }
}

#[async_trait]
impl<T: StorageWriter + ?Sized> StorageWriter for Arc<T> {
    async fn write(&self, bytes: &Bytes, stored_name: &str) -> Result<()> {
        (**self).write(bytes, stored_name).await
    }
}

/// An oracle that never answers, forcing the metadata lookup path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferToMetadata;

#[async_trait]
impl ExistenceOracle for DeferToMetadata {
    async fn exists(&self, _descriptor: &ContentDescriptor) -> Result<ExistenceVerdict> {
        Ok(ExistenceVerdict::Unknown)
    }
}

/// The absent metadata layer: nothing is found and nothing is persisted.
///
/// Ingestion through it reports the stored name as the canonical reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

#[async_trait]
impl MetadataStore for NoMetadata {
    type Record = ();

    async fn find_by_descriptor(&self, _descriptor: &ContentDescriptor) -> Result<Option<()>> {
        Ok(None)
    }

    async fn save(&self, _descriptor: &ContentDescriptor) -> Result<Option<()>> {
        Ok(None)
    }
}

/// Reject stored names that could escape a storage root.
pub fn validate_stored_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(crate::error::StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
