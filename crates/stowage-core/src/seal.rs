//! Field sealing: an injected transform applied to envelope data.
//!
//! The coordinator never seals anything itself. Envelope building applies a
//! [`Sealer`] to the data payload when the configuration asks for it.
//! [`FieldCipher`] is the stock sealer: ChaCha20-Poly1305 over individual
//! string fields, which records opt into via [`Sealable`].

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use crate::error::{CoreError, Result};

const NONCE_LEN: usize = 12;

/// A transform applied in place to an envelope's data payload.
pub trait Sealer<T>: Send + Sync {
    fn seal(&self, data: &mut T) -> Result<()>;
}

/// Seals and opens individual string fields.
pub trait FieldSealer: Send + Sync {
    fn seal_field(&self, plaintext: &str) -> Result<String>;
}

/// A record that knows which of its fields are sensitive.
pub trait Sealable {
    fn seal_fields(&mut self, sealer: &dyn FieldSealer) -> Result<()>;
}

/// ChaCha20-Poly1305 field sealer.
///
/// Sealed fields are rendered as `hex(nonce || ciphertext)` with a fresh
/// random nonce per field.
#[derive(Clone)]
pub struct FieldCipher([u8; 32]);

impl FieldCipher {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw key bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.0).map_err(|e| CoreError::Seal(e.to_string()))
    }

    /// Encrypt a field value.
    pub fn seal_str(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CoreError::Seal(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Decrypt a value produced by [`FieldCipher::seal_str`].
    pub fn open_str(&self, sealed: &str) -> Result<String> {
        let raw = hex::decode(sealed).map_err(|e| CoreError::Seal(e.to_string()))?;
        if raw.len() < NONCE_LEN {
            return Err(CoreError::Seal("sealed value too short".into()));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CoreError::Seal(e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| CoreError::Seal(e.to_string()))
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldCipher(..)")
    }
}

impl FieldSealer for FieldCipher {
    fn seal_field(&self, plaintext: &str) -> Result<String> {
        self.seal_str(plaintext)
    }
}

impl<T: Sealable> Sealer<T> for FieldCipher {
    fn seal(&self, data: &mut T) -> Result<()> {
        data.seal_fields(self)
    }
}
