//! # Speaker Profiles
//!
//! A behavioral summary for one conversation participant, or for the user
//! themself when `is_user_profile` is set.
//!
//! ## Retention
//!
//! ```text
//! set_retention(6, now)   →  retentionMonths = 6,  expiresAt = now + 6 months
//! set_retention(0, now)   →  retentionMonths = 0,  expiresAt = None (keep)
//!
//! is_expired(t)           ⇔  expiresAt < t   (strict)
//! ```

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Default retention period for new profiles, in months
pub const DEFAULT_RETENTION_MONTHS: u32 = 12;

/// A speaker profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether this is the user's own profile
    #[serde(default)]
    pub is_user_profile: bool,
    /// Conversations this profile has been linked to (no duplicates)
    #[serde(default)]
    pub conversation_ids: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// When the profile becomes eligible for cleanup
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Retention period the expiry was computed from (0 = keep)
    #[serde(default)]
    pub retention_months: u32,
    /// Opaque profile analysis from the analysis service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    /// Opaque profile summary from the analysis service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}

impl Profile {
    /// Create a profile with a fresh id and the default retention period
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name)
    }

    /// Create a profile with the given id and the default retention period
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = crate::time::now();
        let mut profile = Self {
            id: id.into(),
            name: name.into(),
            is_user_profile: false,
            conversation_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            expires_at: None,
            retention_months: 0,
            analysis: None,
            summary: None,
        };
        profile.set_retention(DEFAULT_RETENTION_MONTHS, now);
        profile
    }

    /// Create the user's own profile. Self-profiles are kept until deleted.
    pub fn user(name: impl Into<String>) -> Self {
        let mut profile = Self::new(name);
        profile.is_user_profile = true;
        profile.set_retention(0, profile.created_at);
        profile
    }

    /// Set the retention period, recomputing `expires_at` from `from`
    pub fn set_retention(&mut self, months: u32, from: DateTime<Utc>) {
        self.retention_months = months;
        self.expires_at = if months == 0 {
            None
        } else {
            from.checked_add_months(Months::new(months))
        };
    }

    /// Whether the profile has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry < now)
    }

    /// Link a conversation. Returns false if it was already linked.
    pub fn link_conversation(&mut self, conversation_id: impl Into<String>) -> bool {
        let conversation_id = conversation_id.into();
        if self.conversation_ids.contains(&conversation_id) {
            return false;
        }
        self.conversation_ids.push(conversation_id);
        self.updated_at = crate::time::now();
        true
    }

    /// Unlink a conversation. Returns false if it was not linked.
    pub fn unlink_conversation(&mut self, conversation_id: &str) -> bool {
        let before = self.conversation_ids.len();
        self.conversation_ids.retain(|id| id != conversation_id);
        let removed = self.conversation_ids.len() != before;
        if removed {
            self.updated_at = crate::time::now();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_default_retention() {
        let profile = Profile::new("Jordan");
        assert_eq!(profile.retention_months, DEFAULT_RETENTION_MONTHS);
        assert!(profile.expires_at.unwrap() > profile.created_at);
        assert!(!profile.is_user_profile);
    }

    #[test]
    fn test_user_profile_never_expires() {
        let profile = Profile::user("Me");
        assert!(profile.is_user_profile);
        assert!(profile.expires_at.is_none());
        assert!(!profile.is_expired(Utc::now() + Duration::days(10_000)));
    }

    #[test]
    fn test_expiry_is_strict() {
        let mut profile = Profile::with_id("p-1", "Jordan");
        let now = Utc::now();
        profile.expires_at = Some(now);
        assert!(!profile.is_expired(now));
        assert!(profile.is_expired(now + Duration::milliseconds(1)));
    }

    #[test]
    fn test_link_conversation_is_a_set() {
        let mut profile = Profile::with_id("p-1", "Jordan");
        assert!(profile.link_conversation("c-1"));
        assert!(!profile.link_conversation("c-1"));
        assert!(profile.link_conversation("c-2"));
        assert_eq!(profile.conversation_ids, vec!["c-1", "c-2"]);

        assert!(profile.unlink_conversation("c-1"));
        assert!(!profile.unlink_conversation("c-1"));
        assert_eq!(profile.conversation_ids, vec!["c-2"]);
    }

    #[test]
    fn test_zero_retention_clears_expiry() {
        let mut profile = Profile::with_id("p-1", "Jordan");
        profile.set_retention(0, Utc::now());
        assert!(profile.expires_at.is_none());
        assert_eq!(profile.retention_months, 0);
    }
}
