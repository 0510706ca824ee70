//! Sync correlation hashes.

use sha2::{Digest, Sha256};

/// Hash a user identifier into a non-reversible sync correlation id
///
/// SHA-256 of the UTF-8 bytes, as 64 lowercase hex characters.
pub fn generate_user_hash(user_id: &str) -> String {
    hex::encode(Sha256::digest(user_id.as_bytes()))
}
