//! Error types for LCP key handling.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while deriving or unwrapping keys.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The user key does not open the license's key check.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// Ciphertext could not be deciphered (corrupt data or wrong key).
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Algorithm URI is not one this crate implements.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A pre-hashed passphrase could not be decoded.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
