//! SQLite implementation of the metadata store.
//!
//! The primary persistent metadata backend. Uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use stowage_core::{ContentDescriptor, ExistenceVerdict, ExtraParams};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::record::{now_millis, FileRecord};
use crate::traits::{ExistenceOracle, MetadataStore};

const SELECT_RECORD: &str = "SELECT fingerprint, stored_name, original_name, size_bytes,
        extra_params, created_at
 FROM files WHERE stored_name = ?1";

/// SQLite-based metadata store.
///
/// Thread-safe via an internal Mutex. All queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMetadataStore {
    /// Open a SQLite database at the given path, running migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await?
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    let extra_bytes: Vec<u8> = row.get("extra_params")?;
    let extra_params: ExtraParams = ciborium::from_reader(&extra_bytes[..]).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Blob,
            Box::<dyn std::error::Error + Send + Sync>::from(e.to_string()),
        )
    })?;

    Ok(FileRecord {
        fingerprint: row.get("fingerprint")?,
        stored_name: row.get("stored_name")?,
        original_name: row.get("original_name")?,
        size_bytes: row.get("size_bytes")?,
        extra_params,
        created_at: row.get("created_at")?,
    })
}

fn encode_extra(extra: &ExtraParams) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(extra, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    type Record = FileRecord;

    async fn find_by_descriptor(&self, descriptor: &ContentDescriptor) -> Result<Option<FileRecord>> {
        let stored_name = descriptor.stored_name().to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(SELECT_RECORD, params![stored_name], row_to_record)
                .optional()?)
        })
        .await
    }

    async fn save(&self, descriptor: &ContentDescriptor) -> Result<Option<FileRecord>> {
        let record = FileRecord::from_descriptor(descriptor, now_millis());
        let extra = encode_extra(&record.extra_params)?;

        self.with_conn(move |conn| {
            // The first record for a stored name wins; a repeated save
            // returns it unchanged.
            conn.execute(
                "INSERT INTO files (
                    stored_name, fingerprint, original_name, size_bytes,
                    extra_params, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(stored_name) DO NOTHING",
                params![
                    record.stored_name,
                    record.fingerprint,
                    record.original_name,
                    record.size_bytes,
                    extra,
                    record.created_at,
                ],
            )?;

            Ok(conn
                .query_row(SELECT_RECORD, params![record.stored_name], row_to_record)
                .optional()?)
        })
        .await
    }
}

#[async_trait]
impl ExistenceOracle for SqliteMetadataStore {
    async fn exists(&self, descriptor: &ContentDescriptor) -> Result<ExistenceVerdict> {
        let stored_name = descriptor.stored_name().to_string();
        self.with_conn(move |conn| {
            let present: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM files WHERE stored_name = ?1)",
                params![stored_name],
                |row| row.get(0),
            )?;
            Ok(present.into())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(name: &str, data: &[u8]) -> ContentDescriptor {
        let mut extra = ExtraParams::new();
        extra.insert("owner".into(), serde_json::json!("bob"));
        extra.insert("tags".into(), serde_json::json!(["a", "b"]));
        ContentDescriptor::hashed(name, data, extra)
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = SqliteMetadataStore::open_memory().unwrap();
        let d = descriptor("data.csv", b"1,2,3");

        assert!(store.find_by_descriptor(&d).await.unwrap().is_none());
        let saved = store.save(&d).await.unwrap().unwrap();
        let found = store.find_by_descriptor(&d).await.unwrap().unwrap();

        assert_eq!(saved, found);
        assert_eq!(found.stored_name, d.stored_name());
        assert_eq!(found.size_bytes, 5);
        assert_eq!(found.extra_params, *d.extra_params());
    }

    #[tokio::test]
    async fn test_unhashed_record_has_no_fingerprint() {
        let store = SqliteMetadataStore::open_memory().unwrap();
        let d = ContentDescriptor::unhashed("report.pdf", 9, ExtraParams::new()).unwrap();

        let saved = store.save(&d).await.unwrap().unwrap();
        assert_eq!(saved.fingerprint, None);
        assert_eq!(saved.stored_name, "report.pdf");
    }

    #[tokio::test]
    async fn test_repeated_save_is_idempotent() {
        let store = SqliteMetadataStore::open_memory().unwrap();
        let d = descriptor("data.csv", b"1,2,3");

        let first = store.save(&d).await.unwrap().unwrap();
        let second = store.save(&d).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exists() {
        let store = SqliteMetadataStore::open_memory().unwrap();
        let d = descriptor("data.csv", b"1,2,3");

        assert_eq!(store.exists(&d).await.unwrap(), ExistenceVerdict::Absent);
        store.save(&d).await.unwrap();
        assert_eq!(store.exists(&d).await.unwrap(), ExistenceVerdict::Present);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.db");
        let d = descriptor("keep.txt", b"persist me");

        {
            let store = SqliteMetadataStore::open(&path).unwrap();
            store.save(&d).await.unwrap();
        }

        let store = SqliteMetadataStore::open(&path).unwrap();
        let found = store.find_by_descriptor(&d).await.unwrap();
        assert_eq!(found.map(|r| r.original_name), Some("keep.txt".to_string()));
    }
}
