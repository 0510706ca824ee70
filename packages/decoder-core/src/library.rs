//! Where the behavior library comes from.
//!
//! [`LocalStore::load_behavior_library`](crate::LocalStore::load_behavior_library)
//! walks a list of sources in order and caches the first one that answers.
//! The usual order is the asset shipped with the app, then the sync relay.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::model::BehaviorLibrary;

/// A place a behavior library can be fetched from
#[async_trait]
pub trait BehaviorLibrarySource: Send + Sync {
    /// Short name for log lines
    fn name(&self) -> &str;

    /// Fetch and parse the library
    async fn fetch(&self) -> Result<BehaviorLibrary>;
}

/// A library JSON file bundled with the application
pub struct BundledAsset {
    path: PathBuf,
}

impl BundledAsset {
    /// Read the library from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BehaviorLibrarySource for BundledAsset {
    fn name(&self) -> &str {
        "bundled asset"
    }

    async fn fetch(&self) -> Result<BehaviorLibrary> {
        let raw = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::Io(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            Error::Serialization(format!(
                "Behavior library at {} does not parse: {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// A library already in memory, e.g. from `include_str!`
pub struct EmbeddedLibrary {
    json: String,
}

impl EmbeddedLibrary {
    /// Wrap library JSON text
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

#[async_trait]
impl BehaviorLibrarySource for EmbeddedLibrary {
    fn name(&self) -> &str {
        "embedded"
    }

    async fn fetch(&self) -> Result<BehaviorLibrary> {
        serde_json::from_str(&self.json)
            .map_err(|e| Error::Serialization(format!("Embedded behavior library: {}", e)))
    }
}

/// The relay's `GET /api/v1/behaviors` endpoint
#[cfg(feature = "remote-library")]
pub struct RemoteLibrary {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "remote-library")]
impl RemoteLibrary {
    /// Fetch from the relay at `base_url` (e.g. `https://relay.example.com`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[cfg(feature = "remote-library")]
#[derive(serde::Deserialize)]
struct RelayEnvelope {
    success: bool,
    #[serde(default)]
    message: String,
    data: Option<BehaviorLibrary>,
}

#[cfg(feature = "remote-library")]
#[async_trait]
impl BehaviorLibrarySource for RemoteLibrary {
    fn name(&self) -> &str {
        "relay"
    }

    async fn fetch(&self) -> Result<BehaviorLibrary> {
        let url = format!("{}/api/v1/behaviors", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("Failed to fetch {}: {}", url, e)))?;

        let envelope = response
            .json::<RelayEnvelope>()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse relay response: {}", e)))?;

        match envelope {
            RelayEnvelope {
                success: true,
                data: Some(library),
                ..
            } => Ok(library),
            RelayEnvelope { message, .. } => Err(Error::Remote(format!(
                "Relay did not return a library: {}",
                message
            ))),
        }
    }
}
