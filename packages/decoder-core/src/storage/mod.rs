//! # Storage Module
//!
//! Local persistence for the Text Decoder client.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite Database (database.rs)                                  │   │
//! │  │  ─────────────────────────────                                  │   │
//! │  │                                                                 │   │
//! │  │  One `records` table, partitioned by category:                 │   │
//! │  │  • conversations     - id → conversation JSON                  │   │
//! │  │  • profiles          - id → profile JSON                       │   │
//! │  │  • settings          - key → JSON scalar                       │   │
//! │  │  • behavior_library  - "library" / "version"                   │   │
//! │  │  • sync_metadata     - key → string                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Secure Store (secure_store.rs)                                 │   │
//! │  │  ──────────────────────────────                                 │   │
//! │  │                                                                 │   │
//! │  │  Credentials only. AES-256-GCM at rest, optional JSON file.    │   │
//! │  │  Never exported.                                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod database;
mod schema;
mod secure_store;

pub use database::{Batch, Category, Database};
pub use secure_store::SecureStore;

use std::path::{Path, PathBuf};

/// File name of the record database inside a store directory
pub const DATABASE_FILE: &str = "decoder.db";

/// File name of the secure store inside a store directory
pub const SECURE_STORE_FILE: &str = "secure.json";

/// Storage configuration
#[derive(Clone, Default)]
pub struct StoreConfig {
    /// Path to the SQLite database file (None = in-memory)
    pub database_path: Option<PathBuf>,
    /// Path to the secure store file (None = in-memory)
    pub secure_store_path: Option<PathBuf>,
    /// Key used to seal secure entries at rest. Required when
    /// `secure_store_path` is set.
    pub secure_store_key: Option<[u8; 32]>,
}

impl StoreConfig {
    /// Everything in memory. Nothing survives `close()`.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Both stores under `dir`, secure entries sealed with `key`
    pub fn at_dir(dir: impl AsRef<Path>, key: [u8; 32]) -> Self {
        let dir = dir.as_ref();
        Self {
            database_path: Some(dir.join(DATABASE_FILE)),
            secure_store_path: Some(dir.join(SECURE_STORE_FILE)),
            secure_store_key: Some(key),
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_path", &self.database_path)
            .field("secure_store_path", &self.secure_store_path)
            .field("secure_store_key", &self.secure_store_key.map(|_| "<redacted>"))
            .finish()
    }
}
