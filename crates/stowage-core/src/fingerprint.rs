//! The fingerprint engine: content digests used as deduplication keys.
//!
//! A fingerprint is the Blake3 hash of the full payload. Hashing needs the
//! whole payload in memory, so callers opt in per upload; [`read_bounded`]
//! performs the single bounded read that feeds it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{CoreError, Result};

/// A 32-byte Blake3 content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of the given payload.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Fingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Read an entire payload from `reader`, refusing anything over `limit` bytes.
///
/// At most `limit + 1` bytes are pulled from the reader, so an oversized
/// stream is detected without buffering all of it.
pub async fn read_bounded<R>(reader: R, limit: u64) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take(limit.saturating_add(1));
    limited.read_to_end(&mut buf).await?;

    let size = buf.len() as u64;
    if size > limit {
        return Err(CoreError::PayloadTooLarge { size, limit });
    }
    Ok(Bytes::from(buf))
}
