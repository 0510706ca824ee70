//! Server configuration and shared state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::rate_limit::RateLimiter;
use crate::sync::BlobStore;

/// Default port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default upper bound on one encrypted blob (10 MiB).
pub const DEFAULT_MAX_BLOB_BYTES: usize = 10 * 1024 * 1024;

/// Behavior library file name inside the data directory.
pub const BEHAVIOR_LIBRARY_FILE: &str = "behavior_library.json";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    /// Root for persisted data. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Largest accepted `encrypted_data`, in bytes
    pub max_blob_bytes: usize,
    /// Explicit behavior library file. Defaults to
    /// `{data_dir}/behavior_library.json`.
    pub behavior_library_path: Option<PathBuf>,
}

impl RelayConfig {
    /// Where the behavior library is read from, if anywhere.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.behavior_library_path
            .clone()
            .or_else(|| self.data_dir.as_ref().map(|d| d.join(BEHAVIOR_LIBRARY_FILE)))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: None,
            max_blob_bytes: DEFAULT_MAX_BLOB_BYTES,
            behavior_library_path: None,
        }
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub blobs: BlobStore,
    pub limiter: RateLimiter,
}

impl RelayState {
    /// Build the state and load any persisted blobs.
    pub fn new(config: RelayConfig) -> Self {
        let blobs = BlobStore::new(config.data_dir.as_deref());
        blobs.load_from_disk();
        Self {
            config: Arc::new(config),
            blobs,
            limiter: RateLimiter::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_blob_bytes, 10 * 1024 * 1024);
        assert!(config.library_path().is_none());
    }

    #[test]
    fn test_library_path() {
        let config = RelayConfig {
            data_dir: Some(PathBuf::from("/data")),
            ..RelayConfig::default()
        };
        assert_eq!(
            config.library_path(),
            Some(PathBuf::from("/data/behavior_library.json"))
        );

        let config = RelayConfig {
            behavior_library_path: Some(PathBuf::from("/etc/lib.json")),
            ..config
        };
        assert_eq!(config.library_path(), Some(PathBuf::from("/etc/lib.json")));
    }

    #[test]
    fn test_state_loads_persisted_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let config = RelayConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..RelayConfig::default()
        };

        let state = RelayState::new(config.clone());
        state
            .blobs
            .put(crate::sync::store::SyncBlob {
                user_hash: "u".into(),
                encrypted_data: "iv:ct".into(),
                sync_id: "s".into(),
                uploaded_at: "t".into(),
            })
            .unwrap();

        assert_eq!(RelayState::new(config).blobs.count(), 1);
    }
}
