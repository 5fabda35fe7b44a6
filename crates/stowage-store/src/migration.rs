//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration transforms the
//! schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::record::now_millis;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: file records.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE files (
            stored_name TEXT PRIMARY KEY,     -- fingerprint hex + suffix, or original name
            fingerprint TEXT,                 -- 64 hex chars, NULL when unhashed
            original_name TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            extra_params BLOB NOT NULL,       -- CBOR map of opaque caller params
            created_at INTEGER NOT NULL       -- Unix ms
        );

        CREATE INDEX idx_files_fingerprint ON files(fingerprint);
        "#,
    )?;

    Ok(())
}
