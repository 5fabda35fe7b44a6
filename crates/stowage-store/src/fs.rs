//! Filesystem byte storage.
//!
//! Bytes land under `<root>/<stored_name>`. Each write goes to a temporary
//! file in the root and is renamed into place, so a reader never observes a
//! partially written file under a stored name.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use stowage_core::{ContentDescriptor, ExistenceVerdict};
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};
use crate::traits::{validate_stored_name, ExistenceOracle, StorageWriter};

/// Byte storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Open storage at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a stored name.
    pub fn path_for(&self, stored_name: &str) -> Result<PathBuf> {
        validate_stored_name(stored_name)?;
        Ok(self.root.join(stored_name))
    }
}

#[async_trait]
impl StorageWriter for FsStorage {
    async fn write(&self, bytes: &Bytes, stored_name: &str) -> Result<()> {
        let target = self.path_for(stored_name)?;
        let root = self.root.clone();
        let bytes = bytes.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| StoreError::Io(e.error))?;
            tracing::debug!(path = %target.display(), size = bytes.len(), "persisted upload");
            Ok(())
        })
        .await?
    }
}

/// Presence of the stored file alone. A file left behind by a failed
/// metadata save reads as present, so later attempts reuse it without ever
/// saving a record; pair `FsStorage` with the metadata store as the oracle
/// when records matter.
#[async_trait]
impl ExistenceOracle for FsStorage {
    async fn exists(&self, descriptor: &ContentDescriptor) -> Result<ExistenceVerdict> {
        let path = self.path_for(descriptor.stored_name())?;
        Ok(tokio::fs::try_exists(path).await?.into())
    }
}
