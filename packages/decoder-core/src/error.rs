//! # Error Handling
//!
//! Error types for the Text Decoder local store.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Lifecycle Errors                                                  │
//! │  │   └── NotInitialized        - Store not opened (or already closed)  │
//! │  │                                                                      │
//! │  ├── Sync Envelope Errors                                              │
//! │  │   ├── FormatError           - Blob is not "<iv>:<ciphertext>"       │
//! │  │   ├── DecryptionFailed      - Wrong key or tampered ciphertext      │
//! │  │   ├── EncryptionFailed      - Cipher failure during export          │
//! │  │   └── CorruptPayload        - Decrypted text is not a snapshot      │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── CorruptRecord         - Stored record does not parse          │
//! │  │   ├── NotFound              - Required item is missing              │
//! │  │   ├── TypeMismatch          - Setting read with the wrong type      │
//! │  │   ├── Database              - SQLite failure                        │
//! │  │   ├── SecureStore           - Credential area failure               │
//! │  │   └── Io                    - Filesystem failure                    │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── Serialization         - Encoding failure                      │
//! │      └── Remote                - Remote fetch failure                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers (the UI state holders) turn these into user-facing messages; the
//! store itself never swallows a failed write.

use thiserror::Error;

/// Result type alias for local store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the local store
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Lifecycle Errors (100-199)
    // ========================================================================

    /// The store has not been initialized, or has been closed
    #[error("Local store has not been initialized. Call LocalStore::init() first.")]
    NotInitialized,

    // ========================================================================
    // Sync Envelope Errors (300-399)
    // ========================================================================

    /// The export envelope does not have the expected shape
    #[error("Invalid sync blob format: {0}")]
    FormatError(String),

    /// Decryption failed (wrong key or tampered data)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The decrypted payload is not a valid snapshot
    #[error("Corrupt sync payload: {0}")]
    CorruptPayload(String),

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// A stored record could not be parsed
    #[error("Corrupt {category} record '{id}': {reason}")]
    CorruptRecord {
        /// Record category (conversations, profiles, ...)
        category: String,
        /// Record key
        id: String,
        /// Parser message
        reason: String,
    },

    /// Item not found
    #[error("Item not found: {0}")]
    NotFound(String),

    /// A setting was read as a type it was not stored as
    #[error("Setting '{key}' holds a {found}, expected {expected}")]
    TypeMismatch {
        /// Setting key
        key: String,
        /// Requested type
        expected: &'static str,
        /// Stored type
        found: &'static str,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Secure credential storage error
    #[error("Secure storage error: {0}")]
    SecureStore(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Remote fetch error
    #[error("Remote fetch failed: {0}")]
    Remote(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// - 100-199: Lifecycle
    /// - 300-399: Sync envelope
    /// - 400-499: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::NotInitialized => 100,

            Error::FormatError(_) => 300,
            Error::DecryptionFailed(_) => 301,
            Error::EncryptionFailed(_) => 302,
            Error::CorruptPayload(_) => 303,

            Error::CorruptRecord { .. } => 400,
            Error::NotFound(_) => 401,
            Error::TypeMismatch { .. } => 402,
            Error::Database(_) => 403,
            Error::SecureStore(_) => 404,
            Error::Io(_) => 405,

            Error::Serialization(_) => 900,
            Error::Remote(_) => 901,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Remote(_) | Error::Io(_))
    }

    pub(crate) fn corrupt(category: &str, id: &str, reason: impl ToString) -> Self {
        Error::CorruptRecord {
            category: category.to_string(),
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotInitialized.code(), 100);
        assert_eq!(Error::FormatError("x".into()).code(), 300);
        assert_eq!(Error::DecryptionFailed("x".into()).code(), 301);
        assert_eq!(Error::CorruptPayload("x".into()).code(), 303);
        assert_eq!(Error::corrupt("profiles", "p1", "bad").code(), 400);
        assert_eq!(Error::Serialization("x".into()).code(), 900);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Remote("timeout".into()).is_recoverable());
        assert!(!Error::DecryptionFailed("bad key".into()).is_recoverable());
        assert!(!Error::NotInitialized.is_recoverable());
    }

    #[test]
    fn test_corrupt_record_message() {
        let err = Error::corrupt("conversations", "c-1", "expected value");
        let msg = err.to_string();
        assert!(msg.contains("conversations"));
        assert!(msg.contains("c-1"));
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = Error::TypeMismatch {
            key: "theme".into(),
            expected: "bool",
            found: "string",
        };
        assert_eq!(err.to_string(), "Setting 'theme' holds a string, expected bool");
    }
}
