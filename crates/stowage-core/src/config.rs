//! Per-call ingestion configuration.
//!
//! An [`IngestConfig`] is a snapshot: callers build or load one and pass it
//! by reference into every ingestion, so nothing here is process-global.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default envelope code for success.
pub const DEFAULT_OK_CODE: i32 = 200;

/// Default envelope code for failure.
pub const DEFAULT_ERROR_CODE: i32 = 400;

/// Default message for data-bearing success envelopes.
pub const DEFAULT_OK_MESSAGE: &str = "request ok";

/// Ingestion settings.
///
/// Deserializes from the camelCase JSON document used by the surrounding
/// service; every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestConfig {
    /// Largest payload accepted, in bytes.
    pub max_upload_file_size: u64,
    /// Apply the sealing transform to envelope data.
    pub sealed: bool,
    pub ok_code: i32,
    pub error_code: i32,
    pub ok_message: String,
    /// After an `Unknown` verdict, repeat a missed metadata lookup once
    /// before treating the content as absent.
    pub recheck_unknown_miss: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_file_size: u64::MAX,
            sealed: false,
            ok_code: DEFAULT_OK_CODE,
            error_code: DEFAULT_ERROR_CODE,
            ok_message: DEFAULT_OK_MESSAGE.to_string(),
            recheck_unknown_miss: false,
        }
    }
}

impl IngestConfig {
    /// Parse a JSON configuration document. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_upload_file_size(mut self, limit: u64) -> Self {
        self.max_upload_file_size = limit;
        self
    }

    pub fn with_sealed(mut self, sealed: bool) -> Self {
        self.sealed = sealed;
        self
    }

    pub fn with_recheck_unknown_miss(mut self, recheck: bool) -> Self {
        self.recheck_unknown_miss = recheck;
        self
    }
}
