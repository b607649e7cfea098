//! The key handed to resource decryption.

use crate::cipher;
use crate::error::CryptoResult;
use crate::key::ContentKey;

/// Content key plus the cipher it is declared for.
///
/// Lives only as long as the license handle that produced it; the key bytes
/// are wiped when it is dropped.
#[derive(Clone, Debug)]
pub struct DecryptionContext {
    key: ContentKey,
    cipher_id: String,
}

impl DecryptionContext {
    pub fn new(key: ContentKey, cipher_id: impl Into<String>) -> Self {
        Self {
            key,
            cipher_id: cipher_id.into(),
        }
    }

    /// Raw content key bytes.
    #[must_use]
    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }

    /// Cipher URI declared by the license.
    #[must_use]
    pub fn cipher_id(&self) -> &str {
        &self.cipher_id
    }

    /// Deciphers one resource buffer. Empty input gives empty output.
    pub fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        cipher::decrypt(self.key.as_bytes(), data)
    }
}
