//! Key handling for the LCP basic encryption profile.
//!
//! The chain from passphrase to content key:
//! - the passphrase is hashed (SHA-256) into a 32-byte user key
//! - the user key opens the license's `key_check`, which must decrypt to the license id
//! - the user key then unwraps the content key (AES-256-CBC, IV prefixed)
//!
//! A key check mismatch is reported as [`CryptoError::InvalidPassphrase`], distinct
//! from [`CryptoError::DecryptionFailed`] for corrupt or undecipherable material.

mod cipher;
mod context;
mod derivation;
mod error;
mod key;

pub use cipher::{decrypt, decrypt_base64, encrypt, encrypt_to_base64, BLOCK_SIZE, IV_SIZE};
pub use context::DecryptionContext;
pub use derivation::{
    derive_user_key, unlock_content_key, validate, AES256_CBC_ALGORITHM, SHA256_ALGORITHM,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{generate_random_key, ContentKey, Passphrase, UserKey, KEY_SIZE};
