//! # Cryptography Module
//!
//! The two ciphers the local store uses, plus the sync correlation hash.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CRYPTOGRAPHIC PRIMITIVES                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sync envelope (envelope.rs)                                           │
//! │  • AES-256-GCM, 16-byte IV                                             │
//! │  • Key: passphrase truncated / padded to 32 bytes                      │
//! │  • Output: base64(iv) ":" base64(ciphertext)                           │
//! │                                                                         │
//! │  Secure store at rest (encryption.rs)                                  │
//! │  • AES-256-GCM, 12-byte nonce                                          │
//! │  • AAD: entry key name                                                 │
//! │                                                                         │
//! │  User hash (hash.rs)                                                   │
//! │  • SHA-256, lowercase hex                                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Randomness always comes from `rand::rngs::OsRng`. Key material is wrapped
//! in zeroizing containers.

mod encryption;
pub mod envelope;
mod hash;

pub use encryption::{decrypt, encrypt, EncryptionKey, Nonce, KEY_SIZE, NONCE_SIZE};
pub use hash::generate_user_hash;
