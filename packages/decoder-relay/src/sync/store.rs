//! Persistent storage for encrypted sync blobs.
//!
//! Stores one blob per user hash as a JSON file in `{data_dir}/sync/`.
//! Uses atomic writes (write to a per-write .tmp, rename) to prevent
//! corruption.
//! File names are the SHA-256 of the user hash, so client input never
//! becomes a path component.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::short_hash;

// ── Types ────────────────────────────────────────────────────────────────────

/// A stored sync upload. The relay never sees inside `encrypted_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBlob {
    pub user_hash: String,
    pub encrypted_data: String,
    pub sync_id: String,
    pub uploaded_at: String,
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Suffix source for temp files, so concurrent writes never share one.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed sync blob store with in-memory cache.
#[derive(Clone)]
pub struct BlobStore {
    /// In-memory cache: userHash -> SyncBlob
    blobs: Arc<DashMap<String, SyncBlob>>,
    /// Directory for persistence (`{data_dir}/sync/`).
    sync_dir: Option<PathBuf>,
}

impl BlobStore {
    /// Create a new blob store.
    ///
    /// `data_dir` is the relay's data directory. `None` keeps blobs in
    /// memory only.
    pub fn new(data_dir: Option<&Path>) -> Self {
        Self {
            blobs: Arc::new(DashMap::new()),
            sync_dir: data_dir.map(|d| d.join("sync")),
        }
    }

    /// Load all blobs from disk into memory.
    ///
    /// Called once at startup. Returns the number of blobs loaded.
    pub fn load_from_disk(&self) -> usize {
        let dir = match &self.sync_dir {
            Some(d) => d,
            None => {
                tracing::info!("[Sync] No data_dir configured, running in-memory only");
                return 0;
            }
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %dir.display(), "[Sync] No sync directory, starting fresh");
                return 0;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %dir.display(),
                    "[Sync] Failed to read sync directory"
                );
                return 0;
            }
        };

        let mut count = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            // Skips leftover .json.tmp files too: their extension is "tmp"
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let blob = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<SyncBlob>(&raw).map_err(|e| e.to_string()));

            match blob {
                Ok(blob) => {
                    self.blobs.insert(blob.user_hash.clone(), blob);
                    count += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "[Sync] Failed to load sync blob, skipping"
                    );
                }
            }
        }

        tracing::info!(count = count, "[Sync] Sync blobs loaded from disk");
        count
    }

    fn blob_path(dir: &Path, user_hash: &str) -> PathBuf {
        dir.join(format!("{}.json", hex::encode(Sha256::digest(user_hash.as_bytes()))))
    }

    /// Persist a single blob using temp file + rename.
    fn persist(&self, blob: &SyncBlob) -> io::Result<()> {
        let Some(dir) = &self.sync_dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;

        let path = Self::blob_path(dir, &blob.user_hash);
        let json = serde_json::to_vec(blob).map_err(io::Error::other)?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        std::fs::write(&tmp_path, &json)?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(())
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Store (or replace) the blob for a user.
    pub fn put(&self, blob: SyncBlob) -> io::Result<()> {
        self.persist(&blob)?;
        tracing::info!(
            user = %short_hash(&blob.user_hash),
            bytes = blob.encrypted_data.len(),
            "[Sync] Stored sync blob"
        );
        self.blobs.insert(blob.user_hash.clone(), blob);
        Ok(())
    }

    /// Get the blob for a user.
    pub fn get(&self, user_hash: &str) -> Option<SyncBlob> {
        self.blobs.get(user_hash).map(|r| r.clone())
    }

    /// Delete the blob for a user. Returns whether one existed.
    pub fn delete(&self, user_hash: &str) -> io::Result<bool> {
        if let Some(dir) = &self.sync_dir {
            match std::fs::remove_file(Self::blob_path(dir, user_hash)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self.blobs.remove(user_hash).is_some())
    }

    /// Number of stored blobs.
    pub fn count(&self) -> usize {
        self.blobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(user_hash: &str, data: &str) -> SyncBlob {
        SyncBlob {
            user_hash: user_hash.to_string(),
            encrypted_data: data.to_string(),
            sync_id: "sync".to_string(),
            uploaded_at: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_in_memory_put_get_delete() {
        let store = BlobStore::new(None);
        assert_eq!(store.load_from_disk(), 0);

        store.put(blob("abc", "iv:ct")).unwrap();
        assert_eq!(store.get("abc").unwrap().encrypted_data, "iv:ct");

        // Replacing keeps one blob per user
        store.put(blob("abc", "iv2:ct2")).unwrap();
        assert_eq!(store.count(), 1);
        assert_eq!(store.get("abc").unwrap().encrypted_data, "iv2:ct2");

        assert!(store.delete("abc").unwrap());
        assert!(!store.delete("abc").unwrap());
        assert!(store.get("abc").is_none());
    }

    #[test]
    fn test_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();

        let store = BlobStore::new(Some(dir.path()));
        store.put(blob("user-a", "a")).unwrap();
        store.put(blob("user-b", "b")).unwrap();
        store.delete("user-b").unwrap();

        // A stray temp file is ignored
        std::fs::write(dir.path().join("sync").join("junk.json.tmp"), "{").unwrap();

        let reloaded = BlobStore::new(Some(dir.path()));
        assert_eq!(reloaded.load_from_disk(), 1);
        assert_eq!(reloaded.get("user-a").unwrap().encrypted_data, "a");
        assert!(reloaded.get("user-b").is_none());
    }

    #[test]
    fn test_concurrent_puts_for_one_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(Some(dir.path()));

        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..10 {
                        store.put(blob("same-user", &format!("{t}-{i}"))).unwrap();
                    }
                });
            }
        });

        let names: Vec<String> = std::fs::read_dir(dir.path().join("sync"))
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"));

        let reloaded = BlobStore::new(Some(dir.path()));
        assert_eq!(reloaded.load_from_disk(), 1);
    }

    #[test]
    fn test_hostile_hash_stays_inside_sync_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(Some(dir.path()));
        store.put(blob("../../escape", "x")).unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path().join("sync"))
            .unwrap()
            .flatten()
            .collect();
        assert_eq!(files.len(), 1);
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }
}
