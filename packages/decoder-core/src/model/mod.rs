//! # Domain Records
//!
//! The entities the local store persists. Each one serializes to a canonical
//! camelCase JSON document, which is both the on-disk record format and the
//! per-record encoding inside a sync snapshot.
//!
//! ```text
//! ┌─────────────────┐  conversationIds   ┌─────────────────┐
//! │     Profile     │ ─────────────────► │  Conversation   │
//! │                 │  (back-reference,  │                 │
//! │ isUserProfile   │   not ownership)   │ messages[]      │
//! │ expiresAt       │                    │ updatedAt       │
//! └─────────────────┘                    └─────────────────┘
//!
//! ┌─────────────────┐                    ┌─────────────────┐
//! │  SettingValue   │                    │ BehaviorLibrary │
//! │ Bool|Int|Float| │                    │ categories →    │
//! │ Text            │                    │ subcategories → │
//! └─────────────────┘                    │ behaviors       │
//!                                        └─────────────────┘
//! ```

mod behavior;
mod conversation;
mod profile;
mod setting;

pub use behavior::{
    Behavior, BehaviorCategory, BehaviorLibrary, BehaviorSubcategory, DEFAULT_LIBRARY_VERSION,
};
pub use conversation::{Conversation, Message};
pub use profile::{Profile, DEFAULT_RETENTION_MONTHS};
pub use setting::{FromSettingValue, SettingValue};

use serde::{Deserialize, Serialize};

/// Read-only aggregate snapshot of the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Number of stored conversations
    pub conversation_count: usize,
    /// Number of stored profiles
    pub profile_count: usize,
    /// Whether a behavior library is cached
    pub behavior_library_loaded: bool,
    /// Last successful sync, if any
    pub last_sync_time: Option<chrono::DateTime<chrono::Utc>>,
}
