//! # Secure Storage
//!
//! An isolated credential area for secrets such as API tokens. Entries never
//! go into the record database and are never part of a sync export.
//!
//! ## Storage Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SECURE STORAGE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SecureStore                                                    │   │
//! │  │  ───────────                                                    │   │
//! │  │  • store(key, value)   - Encrypt and store                     │   │
//! │  │  • retrieve(key)       - Retrieve and decrypt                  │   │
//! │  │  • delete(key)         - Remove one entry                      │   │
//! │  │  • clear()             - Remove every entry                    │   │
//! │  └──────────────────────────────┬──────────────────────────────────┘   │
//! │                                 │                                       │
//! │                  ┌──────────────┴──────────────┐                        │
//! │                  ▼                             ▼                        │
//! │         ┌─────────────────┐          ┌─────────────────┐               │
//! │         │   In-memory     │          │   JSON file     │               │
//! │         │   map (always)  │ ───────► │   (optional)    │               │
//! │         └─────────────────┘ persist  └─────────────────┘               │
//! │                                                                         │
//! │  File format: { "<key>": "<base64(nonce ‖ ciphertext)>" }              │
//! │  Written atomically: <file>.tmp then rename.                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every value written to a file is sealed with AES-256-GCM, using the entry
//! key as associated data. The keyless in-memory store keeps values as-is and
//! is only suitable for tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::crypto::{decrypt, encrypt, EncryptionKey, Nonce, NONCE_SIZE};
use crate::error::{Error, Result};

/// Secure credential storage
pub struct SecureStore {
    memory: RwLock<HashMap<String, Vec<u8>>>,

    /// Optional encryption key for values at rest
    encryption_key: Option<EncryptionKey>,

    /// Backing file, if persistent
    path: Option<PathBuf>,
}

impl SecureStore {
    /// Create an in-memory secure store
    pub fn new() -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            encryption_key: None,
            path: None,
        }
    }

    /// Create an in-memory secure store with an encryption key
    ///
    /// All data will be encrypted before storage.
    pub fn with_encryption(key: [u8; 32]) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            encryption_key: Some(EncryptionKey::from_bytes(key)),
            path: None,
        }
    }

    /// Open a file-backed secure store, loading any existing entries
    ///
    /// A file-backed store always seals its values.
    pub fn open(path: &Path, key: [u8; 32]) -> Result<Self> {
        let memory = load_file(path)?;
        tracing::debug!(entries = memory.len(), "Secure store loaded");

        Ok(Self {
            memory: RwLock::new(memory),
            encryption_key: Some(EncryptionKey::from_bytes(key)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Store data securely
    ///
    /// The data will be encrypted if an encryption key was provided.
    pub fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        let data = if let Some(ref enc_key) = self.encryption_key {
            let (nonce, ciphertext) = encrypt(enc_key, value, key.as_bytes())?;
            let mut result = nonce.as_bytes().to_vec();
            result.extend_from_slice(&ciphertext);
            result
        } else {
            value.to_vec()
        };

        let mut storage = self.memory.write();
        let previous = storage.insert(key.to_string(), data);
        if let Err(e) = self.persist(&storage) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => storage.insert(key.to_string(), old),
                None => storage.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Retrieve data securely
    ///
    /// The data will be decrypted if an encryption key was provided.
    pub fn retrieve(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let data = match self.memory.read().get(key) {
            Some(d) => d.clone(),
            None => return Ok(None),
        };

        let Some(ref enc_key) = self.encryption_key else {
            return Ok(Some(Zeroizing::new(data)));
        };

        if data.len() < NONCE_SIZE {
            return Err(Error::SecureStore(format!(
                "Stored value for '{}' is too short",
                key
            )));
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        let plaintext = decrypt(enc_key, &Nonce::from_bytes(nonce), ciphertext, key.as_bytes())
            .map_err(|e| Error::SecureStore(format!("Failed to unseal '{}': {}", key, e)))?;
        Ok(Some(Zeroizing::new(plaintext)))
    }

    /// Delete data from secure storage
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut storage = self.memory.write();
        match storage.remove(key) {
            Some(old) => {
                if let Err(e) = self.persist(&storage) {
                    storage.insert(key.to_string(), old);
                    return Err(e);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Check if a key exists
    pub fn exists(&self, key: &str) -> bool {
        self.memory.read().contains_key(key)
    }

    /// Remove every entry. Returns the number removed.
    pub fn clear(&self) -> Result<usize> {
        let mut storage = self.memory.write();
        let removed = std::mem::take(&mut *storage);
        if let Err(e) = self.persist(&storage) {
            *storage = removed;
            return Err(e);
        }
        Ok(removed.len())
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.memory.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.memory.read().is_empty()
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write the whole map to disk using temp file + rename
    fn persist(&self, storage: &HashMap<String, Vec<u8>>) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let encoded: BTreeMap<&str, String> = storage
            .iter()
            .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
            .collect();
        let json = serde_json::to_vec_pretty(&encoded)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::SecureStore(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)
            .map_err(|e| Error::SecureStore(format!("Failed to write secure store: {}", e)))?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::SecureStore(format!(
                "Failed to replace secure store file: {}",
                e
            )));
        }
        Ok(())
    }
}

impl Default for SecureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn load_file(path: &Path) -> Result<HashMap<String, Vec<u8>>> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(Error::SecureStore(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let encoded: HashMap<String, String> = serde_json::from_slice(&raw)
        .map_err(|e| Error::SecureStore(format!("Secure store file is corrupt: {}", e)))?;

    encoded
        .into_iter()
        .map(|(k, v)| {
            let bytes = STANDARD.decode(&v).map_err(|e| {
                Error::SecureStore(format!("Entry '{}' is not valid base64: {}", k, e))
            })?;
            Ok((k, bytes))
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
