//! Key material and passphrases.
//!
//! All types here zeroize their bytes on drop and redact themselves in `Debug`.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of user and content keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// A key derived from the user's passphrase.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UserKey {
    bytes: [u8; KEY_SIZE],
}

impl UserKey {
    /// Creates a user key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Hex form of the key, which is also the "already hashed" passphrase form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl std::fmt::Debug for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The symmetric key protecting publication resources.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    bytes: [u8; KEY_SIZE],
}

impl ContentKey {
    /// Creates a content key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Creates a content key from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes: array })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A passphrase candidate, either as typed by the user or already hashed.
///
/// Hashed passphrases are the hex-encoded SHA-256 digest, as kept by the
/// passphrase cache.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum Passphrase {
    Clear(String),
    Hashed(String),
}

impl Passphrase {
    /// Wraps a passphrase typed by the user.
    pub fn clear(value: impl Into<String>) -> Self {
        Self::Clear(value.into())
    }

    /// Wraps a hex-encoded SHA-256 digest.
    pub fn hashed(hex_digest: impl Into<String>) -> Self {
        Self::Hashed(hex_digest.into().to_ascii_lowercase())
    }

    /// Returns true if this candidate is already hashed.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        matches!(self, Self::Hashed(_))
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Clear(_) => "Clear",
            Self::Hashed(_) => "Hashed",
        };
        f.debug_tuple(kind).field(&"[REDACTED]").finish()
    }
}

/// Generates a random content key (used when building licenses in tests and tools).
pub fn generate_random_key() -> ContentKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    ContentKey::from_bytes(bytes)
}
