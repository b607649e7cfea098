//! Passphrase to user key to content key.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{ContentKey, Passphrase, UserKey, KEY_SIZE};
use sha2::{Digest, Sha256};

/// User key hash algorithm of the basic profile.
pub const SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Content key and key check cipher of the basic profile.
pub const AES256_CBC_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";

/// Derives the user key from a passphrase using the declared hash algorithm.
///
/// Clear passphrases are hashed; hashed passphrases are hex-decoded as is.
pub fn derive_user_key(passphrase: &Passphrase, algorithm: &str) -> CryptoResult<UserKey> {
    if algorithm != SHA256_ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    match passphrase {
        Passphrase::Clear(clear) => {
            let digest = Sha256::digest(clear.as_bytes());
            let mut bytes = [0u8; KEY_SIZE];
            bytes.copy_from_slice(&digest);
            Ok(UserKey::from_bytes(bytes))
        }
        Passphrase::Hashed(hashed) => {
            let decoded = hex::decode(hashed)
                .map_err(|e| CryptoError::KeyDerivation(format!("invalid hashed passphrase: {e}")))?;
            let bytes: [u8; KEY_SIZE] =
                decoded
                    .as_slice()
                    .try_into()
                    .map_err(|_| CryptoError::InvalidKeyLength {
                        expected: KEY_SIZE,
                        actual: decoded.len(),
                    })?;
            Ok(UserKey::from_bytes(bytes))
        }
    }
}

/// Checks a user key against the license's key check.
///
/// The key check is the license id encrypted with the user key, so a match
/// proves the passphrase is the right one.
#[must_use]
pub fn validate(user_key: &UserKey, key_check: &str, license_id: &str) -> bool {
    match cipher::decrypt_base64(user_key.as_bytes(), key_check) {
        Ok(plain) => plain == license_id.as_bytes(),
        Err(_) => false,
    }
}

/// Unwraps the content key.
///
/// The key check is verified first: a mismatch yields
/// [`CryptoError::InvalidPassphrase`], never a key. Once the passphrase is
/// known good, any failure to unwrap is [`CryptoError::DecryptionFailed`].
pub fn unlock_content_key(
    user_key: &UserKey,
    key_check: &str,
    license_id: &str,
    encrypted_content_key: &str,
    algorithm: &str,
) -> CryptoResult<ContentKey> {
    if !validate(user_key, key_check, license_id) {
        return Err(CryptoError::InvalidPassphrase);
    }
    if algorithm != AES256_CBC_ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    let mut plain = cipher::decrypt_base64(user_key.as_bytes(), encrypted_content_key)?;
    let key = ContentKey::from_slice(&plain).map_err(|_| {
        CryptoError::DecryptionFailed(format!(
            "content key has {} bytes, expected {KEY_SIZE}",
            plain.len()
        ))
    });
    zeroize::Zeroize::zeroize(&mut plain);
    key
}
