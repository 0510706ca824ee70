//! # At-Rest Encryption
//!
//! AES-256-GCM for values held in the secure credential store.
//!
//! ```text
//! stored = nonce (12 bytes) ‖ ciphertext ‖ tag (16 bytes)
//! aad    = the entry's key name
//! ```
//!
//! Binding the key name as associated data means a value copied under a
//! different name fails authentication instead of decrypting.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce for AES-GCM encryption. Never reuse one with the same key.
#[derive(Clone, Copy, Debug)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A 256-bit symmetric key, zeroized on drop
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

/// Encrypt with a fresh random nonce
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8], aad: &[u8]) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random();
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let ciphertext = cipher
        .encrypt(
            AesNonce::from_slice(&nonce.0),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Decrypt and authenticate
pub fn decrypt(key: &EncryptionKey, nonce: &Nonce, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .decrypt(
            AesNonce::from_slice(&nonce.0),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| {
            Error::DecryptionFailed("Decryption failed: authentication tag mismatch".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_basic() {
        let key = EncryptionKey::from_bytes([7u8; KEY_SIZE]);
        let (nonce, ct) = encrypt(&key, b"api-token", b"gemini_api_key").unwrap();
        let pt = decrypt(&key, &nonce, &ct, b"gemini_api_key").unwrap();
        assert_eq!(pt, b"api-token");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = EncryptionKey::from_bytes([7u8; KEY_SIZE]);
        let (nonce, ct) = encrypt(&key, b"api-token", b"gemini_api_key").unwrap();
        let err = decrypt(&key, &nonce, &ct, b"other_key").unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed(_)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = EncryptionKey::from_bytes([7u8; KEY_SIZE]);
        let (nonce, mut ct) = encrypt(&key, b"api-token", b"k").unwrap();
        ct[0] ^= 0x01;
        assert!(decrypt(&key, &nonce, &ct, b"k").is_err());
    }

    #[test]
    fn test_different_nonces_produce_different_ciphertext() {
        let key = EncryptionKey::from_bytes([7u8; KEY_SIZE]);
        let (_, a) = encrypt(&key, b"same", b"k").unwrap();
        let (_, b) = encrypt(&key, b"same", b"k").unwrap();
        assert_ne!(a, b);
    }
}
