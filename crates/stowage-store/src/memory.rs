//! In-memory implementations of the capability traits.
//!
//! Primarily for testing. Same semantics as the filesystem and SQLite
//! backends, with nothing persisted. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{ContentDescriptor, ExistenceVerdict};

use crate::error::Result;
use crate::record::{now_millis, FileRecord};
use crate::traits::{validate_stored_name, ExistenceOracle, MetadataStore, StorageWriter};

/// In-memory byte storage keyed by stored name.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `stored_name`, if any.
    pub fn get(&self, stored_name: &str) -> Option<Bytes> {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        blobs.get(stored_name).cloned()
    }

    pub fn contains(&self, stored_name: &str) -> bool {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        blobs.contains_key(stored_name)
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageWriter for MemoryStorage {
    async fn write(&self, bytes: &Bytes, stored_name: &str) -> Result<()> {
        validate_stored_name(stored_name)?;
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(stored_name.to_string(), bytes.clone());
        Ok(())
    }
}

#[async_trait]
impl ExistenceOracle for MemoryStorage {
    async fn exists(&self, descriptor: &ContentDescriptor) -> Result<ExistenceVerdict> {
        Ok(self.contains(descriptor.stored_name()).into())
    }
}

/// In-memory metadata store holding [`FileRecord`]s keyed by stored name.
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<String, FileRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved records.
    pub fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All saved records, in no particular order.
    pub fn records(&self) -> Vec<FileRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.values().cloned().collect()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    type Record = FileRecord;

    async fn find_by_descriptor(&self, descriptor: &ContentDescriptor) -> Result<Option<FileRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(descriptor.stored_name()).cloned())
    }

    async fn save(&self, descriptor: &ContentDescriptor) -> Result<Option<FileRecord>> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        // An existing record wins, matching the SQLite backend.
        let record = records
            .entry(descriptor.stored_name().to_string())
            .or_insert_with(|| FileRecord::from_descriptor(descriptor, now_millis()))
            .clone();
        Ok(Some(record))
    }
}

#[async_trait]
impl ExistenceOracle for MemoryMetadataStore {
    async fn exists(&self, descriptor: &ContentDescriptor) -> Result<ExistenceVerdict> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.contains_key(descriptor.stored_name()).into())
    }
}
