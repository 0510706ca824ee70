//! # Local Store
//!
//! The domain-level persistence API used by the app's state holders.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LOCAL STORE LIFECYCLE                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Construct                                                           │
//! │     LocalStore::new(StoreConfig)      nothing opened yet               │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  2. Initialize                                                         │
//! │     init()                  ──► open SQLite (file or memory)           │
//! │                             ──► apply schema                           │
//! │                             ──► open secure store                      │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  3. Ready                                                              │
//! │     conversations · profiles · settings · behavior library ·           │
//! │     secure entries · sync metadata · export / import                   │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  4. Close                                                              │
//! │     close()                 ──► drop handles                           │
//! │                                 (every call now fails NotInitialized)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Listing Order
//!
//! - Conversations: most recently updated first.
//! - Profiles: by name, case-insensitive.
//!
//! Equal keys keep first-insertion order. Records that fail to parse are
//! skipped by the `get_all_*` family and reported with a `warn!` carrying the
//! skipped count; single-record reads surface them as `CorruptRecord`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::crypto::generate_user_hash;
use crate::error::{Error, Result};
use crate::library::BehaviorLibrarySource;
use crate::model::{
    BehaviorLibrary, Conversation, FromSettingValue, Profile, SettingValue, StorageStats,
};
use crate::storage::{Category, Database, SecureStore, StoreConfig};
use crate::sync::{ImportSummary, SyncSnapshot};

/// Behavior library record holding the JSON document
const LIBRARY_KEY: &str = "library";

/// Behavior library record holding the version tag
const LIBRARY_VERSION_KEY: &str = "version";

/// Sync metadata key for the last successful sync
pub const LAST_SYNC_TIME_KEY: &str = "last_sync_time";

/// Open storage handles
struct Handles {
    db: Database,
    secure: SecureStore,
}

/// The local store
///
/// Share it as `Arc<LocalStore>`. All operations take `&self`.
pub struct LocalStore {
    config: StoreConfig,
    handles: RwLock<Option<Arc<Handles>>>,
}

impl LocalStore {
    /// Create a store. Nothing is opened until [`init`](Self::init).
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            handles: RwLock::new(None),
        }
    }

    /// Open the database and secure store. Calling it again is a no-op.
    pub async fn init(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        tracing::info!(
            database = ?self.config.database_path,
            secure_store = ?self.config.secure_store_path,
            "Initializing local store"
        );

        let db = Database::open(self.config.database_path.as_deref())?;
        let secure = match (&self.config.secure_store_path, self.config.secure_store_key) {
            (Some(path), Some(key)) => SecureStore::open(path, key)?,
            (Some(path), None) => {
                return Err(Error::SecureStore(format!(
                    "Secure store at {} needs an encryption key",
                    path.display()
                )))
            }
            (None, Some(key)) => SecureStore::with_encryption(key),
            (None, None) => SecureStore::new(),
        };

        let mut handles = self.handles.write();
        if handles.is_none() {
            *handles = Some(Arc::new(Handles { db, secure }));
            tracing::info!("Local store initialized");
        }
        Ok(())
    }

    /// Drop the open handles. Later calls fail with `NotInitialized`.
    pub async fn close(&self) -> Result<()> {
        if self.handles.write().take().is_some() {
            tracing::info!("Local store closed");
        }
        Ok(())
    }

    /// Whether [`init`](Self::init) has run and [`close`](Self::close) has not
    pub fn is_initialized(&self) -> bool {
        self.handles.read().is_some()
    }

    fn handles(&self) -> Result<Arc<Handles>> {
        self.handles.read().clone().ok_or(Error::NotInitialized)
    }

    // ========================================================================
    // CONVERSATIONS
    // ========================================================================

    /// Insert or replace a conversation
    pub async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        let h = self.handles()?;
        put_json(&h.db, Category::Conversations, &conversation.id, conversation)?;
        tracing::debug!(id = %conversation.id, "Saved conversation");
        Ok(())
    }

    /// Get a conversation by id
    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let h = self.handles()?;
        get_json(&h.db, Category::Conversations, id)
    }

    /// All conversations, most recently updated first
    pub async fn get_all_conversations(&self) -> Result<Vec<Conversation>> {
        let h = self.handles()?;
        let mut conversations: Vec<Conversation> = load_all(&h.db, Category::Conversations)?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    /// Delete a conversation. Missing ids are not an error.
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        let h = self.handles()?;
        if h.db.delete(Category::Conversations, id)? {
            tracing::debug!(id = %id, "Deleted conversation");
        }
        Ok(())
    }

    /// Delete every conversation
    pub async fn delete_all_conversations(&self) -> Result<()> {
        let h = self.handles()?;
        let removed = h.db.clear(Category::Conversations)?;
        tracing::info!(removed, "Deleted all conversations");
        Ok(())
    }

    // ========================================================================
    // PROFILES
    // ========================================================================

    /// Insert or replace a profile
    pub async fn save_profile(&self, profile: &Profile) -> Result<()> {
        let h = self.handles()?;
        put_json(&h.db, Category::Profiles, &profile.id, profile)?;
        tracing::debug!(id = %profile.id, "Saved profile");
        Ok(())
    }

    /// Get a profile by id
    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let h = self.handles()?;
        get_json(&h.db, Category::Profiles, id)
    }

    /// All profiles, sorted by name (case-insensitive)
    pub async fn get_all_profiles(&self) -> Result<Vec<Profile>> {
        let h = self.handles()?;
        let mut profiles: Vec<Profile> = load_all(&h.db, Category::Profiles)?;
        sort_profiles(&mut profiles);
        Ok(profiles)
    }

    /// Delete a profile. Its conversations are left alone.
    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        let h = self.handles()?;
        if h.db.delete(Category::Profiles, id)? {
            tracing::debug!(id = %id, "Deleted profile");
        }
        Ok(())
    }

    /// Delete every profile
    pub async fn delete_all_profiles(&self) -> Result<()> {
        let h = self.handles()?;
        let removed = h.db.clear(Category::Profiles)?;
        tracing::info!(removed, "Deleted all profiles");
        Ok(())
    }

    /// The user's own profile, if one exists
    pub async fn get_user_profile(&self) -> Result<Option<Profile>> {
        Ok(self
            .get_all_profiles()
            .await?
            .into_iter()
            .find(|p| p.is_user_profile))
    }

    /// Delete every profile whose expiry has passed. Returns how many.
    ///
    /// Linked conversations are not touched.
    pub async fn cleanup_expired_profiles(&self) -> Result<usize> {
        let h = self.handles()?;
        let now = crate::time::now();

        let removed = h.db.batch(|batch| {
            let mut removed = 0;
            for (id, raw) in batch.entries(Category::Profiles)? {
                let profile: Profile = match serde_json::from_str(&raw) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "Skipping corrupt profile during cleanup");
                        continue;
                    }
                };
                if profile.is_expired(now) && batch.delete(Category::Profiles, &id)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;

        if removed > 0 {
            tracing::info!(removed, "Cleaned up expired profiles");
        }
        Ok(removed)
    }

    /// Delete a profile together with every conversation it links to
    ///
    /// Unknown profile ids are a no-op. Runs in one transaction.
    pub async fn delete_person_data(&self, profile_id: &str) -> Result<()> {
        let h = self.handles()?;

        let conversations = h.db.batch(|batch| {
            let Some(raw) = batch.get(Category::Profiles, profile_id)? else {
                return Ok(None);
            };
            let profile: Profile = serde_json::from_str(&raw)
                .map_err(|e| Error::corrupt(Category::Profiles.as_str(), profile_id, e))?;

            let mut deleted = 0usize;
            for conversation_id in &profile.conversation_ids {
                if batch.delete(Category::Conversations, conversation_id)? {
                    deleted += 1;
                }
            }
            batch.delete(Category::Profiles, profile_id)?;
            Ok(Some(deleted))
        })?;

        if let Some(conversations) = conversations {
            tracing::info!(profile_id = %profile_id, conversations, "Deleted person data");
        }
        Ok(())
    }

    /// Conversations linked from a profile, in link order
    ///
    /// Ids that no longer resolve are skipped. An unknown profile yields an
    /// empty list.
    pub async fn get_profile_conversations(&self, profile_id: &str) -> Result<Vec<Conversation>> {
        let h = self.handles()?;
        let Some(profile) = get_json::<Profile>(&h.db, Category::Profiles, profile_id)? else {
            return Ok(Vec::new());
        };

        let mut conversations = Vec::with_capacity(profile.conversation_ids.len());
        for id in &profile.conversation_ids {
            match get_json::<Conversation>(&h.db, Category::Conversations, id) {
                Ok(Some(c)) => conversations.push(c),
                Ok(None) => {
                    tracing::debug!(profile_id = %profile_id, id = %id, "Skipping orphaned conversation id");
                }
                Err(Error::CorruptRecord { reason, .. }) => {
                    tracing::warn!(id = %id, reason = %reason, "Skipping corrupt conversation");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(conversations)
    }

    // ========================================================================
    // SETTINGS
    // ========================================================================

    /// Store a setting
    ///
    /// Non-finite floats are rejected with `Serialization`, since they could
    /// not be read back.
    pub async fn save_setting(&self, key: &str, value: impl Into<SettingValue>) -> Result<()> {
        let h = self.handles()?;
        let value = value.into();
        value.ensure_encodable(key)?;
        put_json(&h.db, Category::Settings, key, &value)
    }

    /// Read a setting as `T`
    ///
    /// Returns `TypeMismatch` when the stored value is a different type.
    pub async fn get_setting<T: FromSettingValue>(&self, key: &str) -> Result<Option<T>> {
        let h = self.handles()?;
        match get_json::<SettingValue>(&h.db, Category::Settings, key)? {
            Some(value) => T::try_from_setting(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Read a setting, falling back to `default` only when it is absent
    pub async fn get_setting_or<T: FromSettingValue>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get_setting(key).await?.unwrap_or(default))
    }

    /// Every setting
    pub async fn get_all_settings(&self) -> Result<BTreeMap<String, SettingValue>> {
        let h = self.handles()?;
        load_settings(&h.db)
    }

    /// Remove every setting
    pub async fn reset_settings(&self) -> Result<()> {
        let h = self.handles()?;
        let removed = h.db.clear(Category::Settings)?;
        tracing::info!(removed, "Reset settings");
        Ok(())
    }

    // ========================================================================
    // BEHAVIOR LIBRARY
    // ========================================================================

    /// Cache a behavior library
    pub async fn save_behavior_library(&self, library: &BehaviorLibrary) -> Result<()> {
        let h = self.handles()?;
        let raw = serde_json::to_string(library)?;
        h.db.batch(|batch| {
            batch.put(Category::BehaviorLibrary, LIBRARY_KEY, &raw)?;
            batch.put(Category::BehaviorLibrary, LIBRARY_VERSION_KEY, &library.version)
        })?;
        tracing::info!(
            version = %library.version,
            behaviors = library.count_behaviors(),
            "Cached behavior library"
        );
        Ok(())
    }

    /// The cached behavior library
    pub async fn get_behavior_library(&self) -> Result<Option<BehaviorLibrary>> {
        let h = self.handles()?;
        get_json(&h.db, Category::BehaviorLibrary, LIBRARY_KEY)
    }

    /// Version tag of the cached behavior library
    pub async fn get_behavior_library_version(&self) -> Result<Option<String>> {
        let h = self.handles()?;
        h.db.get(Category::BehaviorLibrary, LIBRARY_VERSION_KEY)
    }

    /// Load the behavior library from the first source that answers
    ///
    /// A fetched library replaces the cache only when its version differs.
    /// When every source fails the cached copy is returned, and `NotFound`
    /// when there is none.
    pub async fn load_behavior_library(
        &self,
        sources: &[&dyn BehaviorLibrarySource],
    ) -> Result<BehaviorLibrary> {
        self.handles()?;

        for source in sources {
            match source.fetch().await {
                Ok(library) => {
                    let cached = self.get_behavior_library_version().await?;
                    if cached.as_deref() != Some(library.version.as_str()) {
                        self.save_behavior_library(&library).await?;
                    }
                    tracing::debug!(source = source.name(), version = %library.version, "Loaded behavior library");
                    return Ok(library);
                }
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Behavior library source failed");
                }
            }
        }

        match self.get_behavior_library().await? {
            Some(library) => {
                tracing::warn!(version = %library.version, "Using cached behavior library");
                Ok(library)
            }
            None => Err(Error::NotFound("behavior library".into())),
        }
    }

    // ========================================================================
    // SECURE ENTRIES
    // ========================================================================

    /// Store a secret in the secure area
    pub async fn save_secure(&self, key: &str, value: &str) -> Result<()> {
        let h = self.handles()?;
        h.secure.store(key, value.as_bytes())
    }

    /// Read a secret from the secure area
    pub async fn get_secure(&self, key: &str) -> Result<Option<String>> {
        let h = self.handles()?;
        match h.secure.retrieve(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|_| Error::SecureStore(format!("Entry '{}' is not valid UTF-8", key))),
            None => Ok(None),
        }
    }

    /// Delete a secret
    pub async fn delete_secure(&self, key: &str) -> Result<()> {
        let h = self.handles()?;
        h.secure.delete(key)?;
        Ok(())
    }

    /// Delete every secret
    pub async fn delete_all_secure(&self) -> Result<()> {
        let h = self.handles()?;
        let removed = h.secure.clear()?;
        tracing::info!(removed, "Deleted all secure entries");
        Ok(())
    }

    // ========================================================================
    // SYNC METADATA
    // ========================================================================

    /// Store a sync metadata value
    pub async fn save_sync_metadata(&self, key: &str, value: &str) -> Result<()> {
        let h = self.handles()?;
        h.db.put(Category::SyncMetadata, key, value)
    }

    /// Read a sync metadata value
    pub async fn get_sync_metadata(&self, key: &str) -> Result<Option<String>> {
        let h = self.handles()?;
        h.db.get(Category::SyncMetadata, key)
    }

    /// Time of the last successful sync. Unparsable values read as `None`.
    pub async fn get_last_sync_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .get_sync_metadata(LAST_SYNC_TIME_KEY)
            .await?
            .and_then(|raw| crate::time::parse_timestamp(&raw)))
    }

    /// Record the time of a successful sync
    pub async fn set_last_sync_time(&self, time: DateTime<Utc>) -> Result<()> {
        self.save_sync_metadata(LAST_SYNC_TIME_KEY, &crate::time::to_rfc3339(&time))
            .await
    }

    // ========================================================================
    // EXPORT / IMPORT
    // ========================================================================

    /// Snapshot conversations, profiles and settings into an encrypted blob
    ///
    /// Secure entries are never included.
    pub async fn export_data_for_sync(&self, passphrase: &str) -> Result<String> {
        let h = self.handles()?;

        let snapshot = SyncSnapshot {
            conversations: h.db.entries(Category::Conversations)?.into_iter().collect(),
            profiles: h.db.entries(Category::Profiles)?.into_iter().collect(),
            settings: load_settings(&h.db)?,
            exported_at: crate::time::to_rfc3339(&crate::time::now()),
        };
        let blob = snapshot.seal(passphrase)?;

        tracing::info!(
            conversations = snapshot.conversations.len(),
            profiles = snapshot.profiles.len(),
            settings = snapshot.settings.len(),
            "Exported data for sync"
        );
        Ok(blob)
    }

    /// Decrypt a blob and merge its records into the store
    ///
    /// Records are upserted, nothing local is removed. The whole merge runs
    /// in one transaction, so a payload with any unparsable record writes
    /// nothing.
    pub async fn import_data_from_sync(&self, blob: &str, passphrase: &str) -> Result<ImportSummary> {
        let h = self.handles()?;

        let snapshot = SyncSnapshot::open(blob, passphrase)?;
        snapshot.validate()?;

        let mut settings = Vec::with_capacity(snapshot.settings.len());
        for (key, value) in &snapshot.settings {
            settings.push((key.as_str(), serde_json::to_string(value)?));
        }

        let summary = h.db.batch(|batch| {
            for (id, raw) in &snapshot.conversations {
                batch.put(Category::Conversations, id, raw)?;
            }
            for (id, raw) in &snapshot.profiles {
                batch.put(Category::Profiles, id, raw)?;
            }
            for (key, raw) in &settings {
                batch.put(Category::Settings, key, raw)?;
            }
            Ok(ImportSummary {
                conversations: snapshot.conversations.len(),
                profiles: snapshot.profiles.len(),
                settings: settings.len(),
            })
        })?;

        tracing::info!(
            conversations = summary.conversations,
            profiles = summary.profiles,
            settings = summary.settings,
            exported_at = %snapshot.exported_at,
            "Imported sync data"
        );
        Ok(summary)
    }

    // ========================================================================
    // MAINTENANCE
    // ========================================================================

    /// Wipe every category and every secure entry
    pub async fn delete_all_data(&self) -> Result<()> {
        let h = self.handles()?;
        h.db.batch(|batch| {
            for category in Category::ALL {
                batch.clear(category)?;
            }
            Ok(())
        })?;
        h.secure.clear()?;
        tracing::info!("Deleted all local data");
        Ok(())
    }

    /// One-way sync correlation id for a user identifier
    pub fn generate_user_hash(&self, user_id: &str) -> String {
        generate_user_hash(user_id)
    }

    /// Aggregate counts
    pub async fn get_storage_stats(&self) -> Result<StorageStats> {
        let h = self.handles()?;
        let stats = StorageStats {
            conversation_count: h.db.count(Category::Conversations)?,
            profile_count: h.db.count(Category::Profiles)?,
            behavior_library_loaded: h.db.get(Category::BehaviorLibrary, LIBRARY_KEY)?.is_some(),
            last_sync_time: h
                .db
                .get(Category::SyncMetadata, LAST_SYNC_TIME_KEY)?
                .and_then(|raw| crate::time::parse_timestamp(&raw)),
        };
        Ok(stats)
    }
}

// ============================================================================
// RECORD HELPERS
// ============================================================================

fn put_json<T: Serialize>(db: &Database, category: Category, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    db.put(category, key, &raw)
}

fn get_json<T: DeserializeOwned>(db: &Database, category: Category, key: &str) -> Result<Option<T>> {
    match db.get(category, key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::corrupt(category.as_str(), key, e)),
        None => Ok(None),
    }
}

/// Parse every record of a category in insertion order, skipping the corrupt ones
fn load_all<T: DeserializeOwned>(db: &Database, category: Category) -> Result<Vec<T>> {
    let entries = db.entries(category)?;
    let total = entries.len();

    let records: Vec<T> = entries
        .into_iter()
        .filter_map(|(key, raw)| match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(category = %category, key = %key, error = %e, "Corrupt record");
                None
            }
        })
        .collect();

    let skipped = total - records.len();
    if skipped > 0 {
        tracing::warn!(category = %category, skipped, "Skipped unparsable records");
    }
    Ok(records)
}

fn load_settings(db: &Database) -> Result<BTreeMap<String, SettingValue>> {
    let mut settings = BTreeMap::new();
    let mut skipped = 0usize;
    for (key, raw) in db.entries(Category::Settings)? {
        match serde_json::from_str::<SettingValue>(&raw) {
            Ok(value) => {
                settings.insert(key, value);
            }
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(category = %Category::Settings, skipped, "Skipped unparsable records");
    }
    Ok(settings)
}

fn sort_profiles(profiles: &mut [Profile]) {
    // Stable: equal names keep insertion order
    profiles.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

// ============================================================================
// TESTS
// ============================================================================
