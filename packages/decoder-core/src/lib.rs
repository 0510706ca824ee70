//! # Decoder Core
//!
//! Local persistence for the Text Decoder client: conversations, speaker
//! profiles, settings, a cached behavior library, secure credentials, and an
//! encrypted export format for moving data between devices.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        DECODER CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │                          LocalStore                               │  │
//! │  │  conversations · profiles · settings · behavior library ·         │  │
//! │  │  secure entries · sync metadata · export / import                 │  │
//! │  └──────┬──────────────────┬──────────────────┬──────────────────┬───┘  │
//! │         │                  │                  │                  │      │
//! │  ┌──────▼──────┐   ┌───────▼──────┐   ┌───────▼──────┐   ┌───────▼────┐ │
//! │  │   Model     │   │   Storage    │   │    Sync      │   │  Library   │ │
//! │  │             │   │              │   │              │   │            │ │
//! │  │ - Records   │   │ - SQLite     │   │ - Snapshot   │   │ - Sources  │ │
//! │  │ - Settings  │   │ - Secure     │   │ - Summary    │   │            │ │
//! │  └─────────────┘   └──────────────┘   └───────┬──────┘   └────────────┘ │
//! │                                               │                         │
//! │                                       ┌───────▼──────┐                  │
//! │                                       │   Crypto     │                  │
//! │                                       │ - Envelope   │                  │
//! │                                       │ - At rest    │                  │
//! │                                       │ - User hash  │                  │
//! │                                       └──────────────┘                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`model`] - Conversations, profiles, settings, behavior library
//! - [`storage`] - SQLite record store and secure credential store
//! - [`crypto`] - Sync envelope, at-rest encryption, user hash
//! - [`sync`] - Export snapshot format
//! - [`library`] - Behavior library sources
//!
//! ## Usage
//!
//! ```ignore
//! use decoder_core::{LocalStore, StoreConfig};
//!
//! let store = LocalStore::new(StoreConfig::at_dir(app_dir, key));
//! store.init().await?;
//! let conversations = store.get_all_conversations().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod crypto;
pub mod error;
pub mod library;
pub mod model;
pub mod storage;
pub mod sync;
pub mod time;

mod store;

pub use crypto::generate_user_hash;
pub use error::{Error, Result};
pub use library::{BehaviorLibrarySource, BundledAsset, EmbeddedLibrary};
#[cfg(feature = "remote-library")]
pub use library::RemoteLibrary;
pub use model::{
    Behavior, BehaviorCategory, BehaviorLibrary, BehaviorSubcategory, Conversation,
    FromSettingValue, Message, Profile, SettingValue, StorageStats,
};
pub use storage::StoreConfig;
pub use store::{LocalStore, LAST_SYNC_TIME_KEY};
pub use sync::{ImportSummary, SyncSnapshot};

/// Returns the version of Decoder Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
