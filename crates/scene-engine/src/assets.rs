//! Asset store used by image nodes
//!
//! The engine only needs to turn an asset id into a file path and pixel
//! size. Upload and storage live elsewhere.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Resolved image asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Resolves asset ids for image nodes
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn resolve(&self, asset_id: &str) -> Result<AssetInfo>;
}

/// Store with no assets; every lookup fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAssetStore;

#[async_trait]
impl AssetStore for NullAssetStore {
    async fn resolve(&self, asset_id: &str) -> Result<AssetInfo> {
        Err(FlowError::Asset(format!(
            "No asset store configured for '{}'",
            asset_id
        )))
    }
}

/// Store backed by an in-memory manifest, usually read from a JSON file
/// mapping asset ids to `{path, width, height}`
#[derive(Debug, Default, Clone)]
pub struct ManifestAssetStore {
    entries: HashMap<String, AssetInfo>,
}

impl ManifestAssetStore {
    pub fn new(entries: HashMap<String, AssetInfo>) -> Self {
        Self { entries }
    }

    /// Read a manifest file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            FlowError::Asset(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        let entries: HashMap<String, AssetInfo> = serde_json::from_str(&content)?;
        log::debug!(
            "Loaded {} assets from manifest {}",
            entries.len(),
            path.display()
        );
        Ok(Self { entries })
    }

    pub fn insert(&mut self, asset_id: impl Into<String>, info: AssetInfo) {
        self.entries.insert(asset_id.into(), info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AssetStore for ManifestAssetStore {
    async fn resolve(&self, asset_id: &str) -> Result<AssetInfo> {
        self.entries
            .get(asset_id)
            .cloned()
            .ok_or_else(|| FlowError::Asset(format!("Unknown asset '{}'", asset_id)))
    }
}

/// Store that asks an HTTP service: `GET {base_url}/assets/{id}`
#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Asset ids are pushed as one escaped path segment
    fn asset_url(&self, asset_id: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            FlowError::Asset(format!("Invalid asset base URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                FlowError::Asset(format!("Asset base URL '{}' cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .push("assets")
            .push(asset_id);
        Ok(url)
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn resolve(&self, asset_id: &str) -> Result<AssetInfo> {
        let url = self.asset_url(asset_id)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FlowError::Asset(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(FlowError::Asset(format!(
                "Asset '{}' lookup returned {}",
                asset_id,
                response.status()
            )));
        }

        response
            .json::<AssetInfo>()
            .await
            .map_err(|e| FlowError::Asset(format!("Invalid asset response for '{}': {}", asset_id, e)))
    }
}
