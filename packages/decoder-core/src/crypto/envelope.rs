//! # Sync Envelope
//!
//! Passphrase encryption for the portable export blob.
//!
//! ## Envelope Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SYNC ENVELOPE                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  passphrase ──► UTF-8 bytes ──► truncate / right-pad with '0' ──► key  │
//! │                                                    (32 bytes)           │
//! │                                                                         │
//! │  iv         ──► 16 random bytes (OsRng), fresh per export              │
//! │                                                                         │
//! │  ciphertext ──► AES-256-GCM(key, iv, plaintext) ‖ tag (16 bytes)       │
//! │                                                                         │
//! │  blob       ──► base64(iv) ":" base64(ciphertext)                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The padding step is not a key-derivation function. Short passphrases
//! produce keys that are mostly filler. It is kept because existing exports
//! must stay importable.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// AES-256-GCM with a 128-bit nonce
type EnvelopeCipher = AesGcm<Aes256, U16>;

/// Envelope key length in bytes
pub const ENVELOPE_KEY_SIZE: usize = 32;

/// Envelope IV length in bytes
pub const ENVELOPE_IV_SIZE: usize = 16;

/// Filler byte for short passphrases (ASCII '0')
const PAD_BYTE: u8 = b'0';

/// Separator between the encoded IV and ciphertext
const SEPARATOR: char = ':';

/// Normalize a passphrase to a 32-byte key by truncating or right-padding
pub fn normalize_key(passphrase: &str) -> Zeroizing<[u8; ENVELOPE_KEY_SIZE]> {
    let mut key = Zeroizing::new([PAD_BYTE; ENVELOPE_KEY_SIZE]);
    let bytes = passphrase.as_bytes();
    let len = bytes.len().min(ENVELOPE_KEY_SIZE);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

/// Encrypt `plaintext` under `passphrase` into an envelope string
pub fn seal(plaintext: &[u8], passphrase: &str) -> Result<String> {
    let key = normalize_key(passphrase);
    let cipher = EnvelopeCipher::new_from_slice(key.as_slice())
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let mut iv = [0u8; ENVELOPE_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok(format!(
        "{}{}{}",
        STANDARD.encode(iv),
        SEPARATOR,
        STANDARD.encode(ciphertext)
    ))
}

/// Decrypt an envelope string produced by [`seal`]
///
/// Shape problems (separator count, base64, IV length) are `FormatError`.
/// Authentication failure, from a wrong passphrase or tampering, is
/// `DecryptionFailed`.
pub fn open(blob: &str, passphrase: &str) -> Result<Vec<u8>> {
    let parts: Vec<&str> = blob.trim().split(SEPARATOR).collect();
    let [iv_b64, ct_b64] = parts.as_slice() else {
        return Err(Error::FormatError(format!(
            "expected 2 parts separated by '{}', found {}",
            SEPARATOR,
            parts.len()
        )));
    };

    let iv = STANDARD
        .decode(iv_b64)
        .map_err(|e| Error::FormatError(format!("Invalid IV encoding: {}", e)))?;
    if iv.len() != ENVELOPE_IV_SIZE {
        return Err(Error::FormatError(format!(
            "IV must be {} bytes, got {}",
            ENVELOPE_IV_SIZE,
            iv.len()
        )));
    }

    let ciphertext = STANDARD
        .decode(ct_b64)
        .map_err(|e| Error::FormatError(format!("Invalid ciphertext encoding: {}", e)))?;

    let key = normalize_key(passphrase);
    let cipher = EnvelopeCipher::new_from_slice(key.as_slice())
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    cipher
        .decrypt(Nonce::<U16>::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| {
            Error::DecryptionFailed("wrong key or tampered ciphertext".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_key_is_padded() {
        let key = normalize_key("abc");
        assert_eq!(&key[..3], b"abc");
        assert!(key[3..].iter().all(|&b| b == b'0'));
    }

    #[test]
    fn test_long_key_is_truncated() {
        let passphrase = "x".repeat(40);
        let key = normalize_key(&passphrase);
        assert_eq!(key.as_slice(), &[b'x'; 32]);
    }

    #[test]
    fn test_empty_key_is_all_filler() {
        assert_eq!(normalize_key("").as_slice(), &[b'0'; 32]);
    }

    #[test]
    fn test_seal_open() {
        let blob = seal(b"{\"hello\":1}", "correct horse").unwrap();
        assert_eq!(blob.matches(':').count(), 1);
        assert_eq!(open(&blob, "correct horse").unwrap(), b"{\"hello\":1}");
    }

    #[test]
    fn test_fresh_iv_per_seal() {
        let a = seal(b"same", "k").unwrap();
        let b = seal(b"same", "k").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let blob = seal(b"secret", "right").unwrap();
        assert!(matches!(open(&blob, "wrong"), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_padding_equivalence() {
        // "abc" and "abc000" normalize to the same key
        let blob = seal(b"secret", "abc").unwrap();
        assert_eq!(open(&blob, "abc000").unwrap(), b"secret");
    }

    #[test]
    fn test_tampered_ciphertext_fails_decryption() {
        let blob = seal(b"secret payload", "k").unwrap();
        let (iv, ct) = blob.split_once(':').unwrap();
        let mut raw = STANDARD.decode(ct).unwrap();
        raw[0] ^= 0xff;
        let tampered = format!("{}:{}", iv, STANDARD.encode(raw));
        assert!(matches!(open(&tampered, "k"), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_malformed_envelopes() {
        assert!(matches!(open("no-separator", "k"), Err(Error::FormatError(_))));
        assert!(matches!(open("a:b:c", "k"), Err(Error::FormatError(_))));
        assert!(matches!(open("!!!:AAAA", "k"), Err(Error::FormatError(_))));

        // Valid base64 but the IV has the wrong length
        let short_iv = format!("{}:{}", STANDARD.encode([0u8; 12]), STANDARD.encode([0u8; 32]));
        assert!(matches!(open(&short_iv, "k"), Err(Error::FormatError(_))));
    }

    proptest! {
        #[test]
        fn prop_normalized_key_is_always_32_bytes(passphrase in ".*") {
            let key = normalize_key(&passphrase);
            prop_assert_eq!(key.len(), ENVELOPE_KEY_SIZE);
            let bytes = passphrase.as_bytes();
            let n = bytes.len().min(ENVELOPE_KEY_SIZE);
            prop_assert_eq!(&key[..n], &bytes[..n]);
        }

        #[test]
        fn prop_seal_open_round_trip(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            passphrase in ".{0,48}",
        ) {
            let blob = seal(&plaintext, &passphrase).unwrap();
            prop_assert_eq!(open(&blob, &passphrase).unwrap(), plaintext);
        }
    }
}
