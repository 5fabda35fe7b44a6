//! Content descriptors: what is known about one upload before it is stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::fingerprint::Fingerprint;

/// Opaque caller-supplied parameters carried alongside an upload.
pub type ExtraParams = BTreeMap<String, serde_json::Value>;

/// Describes a single ingestion attempt.
///
/// Built once per attempt and immutable afterwards. When hashing is enabled
/// the stored name is `fingerprint hex + suffix of the original name`;
/// otherwise it is the original name verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    fingerprint: Option<Fingerprint>,
    stored_name: String,
    original_name: String,
    size_bytes: i64,
    extra_params: ExtraParams,
}

impl ContentDescriptor {
    /// Fingerprint `payload` and derive the stored name from the digest.
    pub fn hashed(
        original_name: impl Into<String>,
        payload: &[u8],
        extra_params: ExtraParams,
    ) -> Self {
        let original_name = original_name.into();
        let fingerprint = Fingerprint::of(payload);
        let stored_name = format!("{}{}", fingerprint.to_hex(), suffix(&original_name));

        Self {
            fingerprint: Some(fingerprint),
            stored_name,
            original_name,
            size_bytes: size_of(payload.len()),
            extra_params,
        }
    }

    /// Skip hashing: the original name becomes the stored name.
    ///
    /// Two different payloads with the same name map to the same stored name;
    /// the caller accepts that collision by opting out of hashing.
    pub fn unhashed(
        original_name: impl Into<String>,
        size_bytes: u64,
        extra_params: ExtraParams,
    ) -> Result<Self> {
        let original_name = original_name.into();
        if original_name.is_empty() {
            return Err(CoreError::InvalidName(original_name));
        }

        Ok(Self {
            fingerprint: None,
            stored_name: original_name.clone(),
            original_name,
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            extra_params,
        })
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// The name the bytes are persisted under. Also the coordination key.
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size_bytes(&self) -> i64 {
        self.size_bytes
    }

    pub fn extra_params(&self) -> &ExtraParams {
        &self.extra_params
    }

    /// Whether the stored name was derived from a fingerprint.
    pub fn is_hashed(&self) -> bool {
        self.fingerprint.is_some()
    }
}

/// The extension of `name`, including the leading dot.
///
/// Only the final path component is considered, and a leading dot
/// (`.bashrc`) does not start an extension.
pub fn suffix(name: &str) -> &str {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &file[idx..],
    }
}

fn size_of(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
