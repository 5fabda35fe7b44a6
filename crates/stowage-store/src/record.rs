//! The metadata record persisted by the bundled metadata stores.

use serde::{Deserialize, Serialize};
use stowage_core::{ContentDescriptor, ExtraParams, FieldSealer, Sealable};

/// A persisted description of stored content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Fingerprint hex, absent for unhashed uploads.
    pub fingerprint: Option<String>,
    pub stored_name: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub extra_params: ExtraParams,
    /// When the record was saved (Unix ms).
    pub created_at: i64,
}

impl FileRecord {
    /// Build the record for a descriptor being saved at `created_at`.
    pub fn from_descriptor(descriptor: &ContentDescriptor, created_at: i64) -> Self {
        Self {
            fingerprint: descriptor.fingerprint().map(|fp| fp.to_hex()),
            stored_name: descriptor.stored_name().to_string(),
            original_name: descriptor.original_name().to_string(),
            size_bytes: descriptor.size_bytes(),
            extra_params: descriptor.extra_params().clone(),
            created_at,
        }
    }
}

impl Sealable for FileRecord {
    /// Seals the original name and every string-valued extra parameter.
    fn seal_fields(&mut self, sealer: &dyn FieldSealer) -> stowage_core::Result<()> {
        self.original_name = sealer.seal_field(&self.original_name)?;
        for value in self.extra_params.values_mut() {
            if let serde_json::Value::String(s) = value {
                *s = sealer.seal_field(s)?;
            }
        }
        Ok(())
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
