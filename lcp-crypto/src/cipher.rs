//! AES-256-CBC with PKCS#7 padding and a prefixed IV.
//!
//! This is the `http://www.w3.org/2001/04/xmlenc#aes256-cbc` layout used for
//! the key check, the wrapped content key, and publication resources:
//! `IV (16 bytes) || ciphertext`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::KEY_SIZE;
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the IV in bytes.
pub const IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

fn check_key(key: &[u8]) -> CryptoResult<()> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }
    Ok(())
}

/// Encrypts plaintext under a fresh random IV.
///
/// # Returns
/// `IV || ciphertext`.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(key)?;

    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let encryptor = Aes256CbcEnc::new_from_slices(key, &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts `IV || ciphertext`.
///
/// Fails with [`CryptoError::DecryptionFailed`] when the input is not a whole
/// number of blocks or the padding is invalid, which is what a wrong key
/// almost always produces.
pub fn decrypt(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(key)?;

    if data.len() < IV_SIZE + BLOCK_SIZE {
        return Err(CryptoError::DecryptionFailed("data too short".to_string()));
    }
    let (iv, ciphertext) = data.split_at(IV_SIZE);
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::DecryptionFailed(
            "ciphertext is not block aligned".to_string(),
        ));
    }

    let decryptor = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed("invalid padding".to_string()))
}

/// Encrypts and returns the base64 form stored in license documents.
pub fn encrypt_to_base64(key: &[u8], plaintext: &[u8]) -> CryptoResult<String> {
    Ok(STANDARD.encode(encrypt(key, plaintext)?))
}

/// Decodes a base64 value from a license document and decrypts it.
pub fn decrypt_base64(key: &[u8], encoded: &str) -> CryptoResult<Vec<u8>> {
    let data = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {e}")))?;
    decrypt(key, &data)
}
