//! # Sync Snapshot
//!
//! The plaintext carried inside a sync envelope.
//!
//! ```text
//! {
//!   "conversations": { "<id>": "<conversation json>", ... },
//!   "profiles":      { "<id>": "<profile json>", ... },
//!   "settings":      { "<key>": <scalar>, ... },
//!   "exported_at":   "<RFC 3339>"
//! }
//! ```
//!
//! Records travel as their stored JSON text, so a snapshot written by one
//! client is read back byte-for-byte by another. Secure entries are never
//! part of a snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crypto::envelope;
use crate::error::{Error, Result};
use crate::model::{Conversation, Profile, SettingValue};

/// Everything a sync export carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Conversation id → serialized conversation
    #[serde(default)]
    pub conversations: BTreeMap<String, String>,
    /// Profile id → serialized profile
    #[serde(default)]
    pub profiles: BTreeMap<String, String>,
    /// Setting key → value
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
    /// When the snapshot was taken
    pub exported_at: String,
}

impl SyncSnapshot {
    /// Seal the snapshot into an envelope string
    pub fn seal(&self, passphrase: &str) -> Result<String> {
        let plaintext = serde_json::to_vec(self)
            .map_err(|e| Error::Serialization(format!("Failed to encode snapshot: {}", e)))?;
        envelope::seal(&plaintext, passphrase)
    }

    /// Open an envelope string and parse the snapshot inside
    pub fn open(blob: &str, passphrase: &str) -> Result<Self> {
        let plaintext = envelope::open(blob, passphrase)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| Error::CorruptPayload(format!("Decrypted data is not a snapshot: {}", e)))
    }

    /// Check that every record parses and sits under its own id, failing on
    /// the first one that does not
    pub fn validate(&self) -> Result<()> {
        for (key, raw) in &self.conversations {
            let conversation = serde_json::from_str::<Conversation>(raw).map_err(|e| {
                Error::CorruptPayload(format!("Conversation '{}' does not parse: {}", key, e))
            })?;
            check_key("Conversation", key, &conversation.id)?;
        }
        for (key, raw) in &self.profiles {
            let profile = serde_json::from_str::<Profile>(raw).map_err(|e| {
                Error::CorruptPayload(format!("Profile '{}' does not parse: {}", key, e))
            })?;
            check_key("Profile", key, &profile.id)?;
        }
        Ok(())
    }
}

fn check_key(kind: &str, key: &str, id: &str) -> Result<()> {
    if key == id {
        Ok(())
    } else {
        Err(Error::CorruptPayload(format!(
            "{} stored under '{}' has id '{}'",
            kind, key, id
        )))
    }
}

/// Counts of what an import merged into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Conversations written
    pub conversations: usize,
    /// Profiles written
    pub profiles: usize,
    /// Settings written
    pub settings: usize,
}

impl ImportSummary {
    /// Total records written
    pub fn total(&self) -> usize {
        self.conversations + self.profiles + self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_shape() {
        let mut snapshot = SyncSnapshot {
            exported_at: "2025-03-01T12:00:00.000Z".into(),
            ..Default::default()
        };
        snapshot
            .settings
            .insert("theme".into(), SettingValue::Text("dark".into()));

        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert!(json["conversations"].is_object());
        assert!(json["profiles"].is_object());
        assert_eq!(json["settings"]["theme"], "dark");
        assert_eq!(json["exported_at"], "2025-03-01T12:00:00.000Z");
    }

    #[test]
    fn test_non_snapshot_plaintext_is_corrupt_payload() {
        let blob = envelope::seal(b"[1, 2, 3]", "k").unwrap();
        assert!(matches!(
            SyncSnapshot::open(&blob, "k"),
            Err(Error::CorruptPayload(_))
        ));

        let blob = envelope::seal(b"not json at all", "k").unwrap();
        assert!(matches!(
            SyncSnapshot::open(&blob, "k"),
            Err(Error::CorruptPayload(_))
        ));
    }

    #[test]
    fn test_unparsable_record_is_corrupt_payload() {
        let mut snapshot = SyncSnapshot::default();
        snapshot.profiles.insert("p-1".into(), "{broken".into());
        assert!(matches!(
            snapshot.validate(),
            Err(Error::CorruptPayload(_))
        ));
    }

    #[test]
    fn test_record_under_foreign_key_is_corrupt_payload() {
        let conversation = Conversation::with_id("c-real");
        let mut snapshot = SyncSnapshot::default();
        snapshot.conversations.insert(
            "c-other".into(),
            serde_json::to_string(&conversation).unwrap(),
        );
        match snapshot.validate() {
            Err(Error::CorruptPayload(msg)) => assert!(msg.contains("c-real")),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut snapshot = SyncSnapshot::default();
        snapshot.conversations.insert(
            "c-real".into(),
            serde_json::to_string(&conversation).unwrap(),
        );
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_summary_total() {
        let summary = ImportSummary {
            conversations: 2,
            profiles: 1,
            settings: 3,
        };
        assert_eq!(summary.total(), 6);
    }
}
