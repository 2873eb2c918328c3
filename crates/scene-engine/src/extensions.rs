//! Typed extension map for non-serializable dependency injection.
//!
//! `ExecutorExtensions` lets hosts inject runtime services (the asset store,
//! HTTP clients) into a run. Extensions are threaded through to every
//! executor.
//!
//! # Example
//!
//! ```ignore
//! use scene_engine::{ExecutorExtensions, ManifestAssetStore};
//! use std::sync::Arc;
//!
//! let mut ext = ExecutorExtensions::new();
//! ext.set_asset_store(Arc::new(ManifestAssetStore::default()));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::AssetStore;

/// Typed extension map holding arbitrary `Send + Sync` values
pub struct ExecutorExtensions {
    inner: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl ExecutorExtensions {
    /// Create an empty extension map.
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Insert a typed value under the given key.
    ///
    /// If a value already exists for this key, it is replaced.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.inner.insert(key.to_string(), Box::new(value));
    }

    /// Get a reference to a typed value by key.
    ///
    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.inner.get(key).and_then(|v| v.downcast_ref())
    }

    /// Check whether a key exists in the map.
    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn set_asset_store(&mut self, store: Arc<dyn AssetStore>) {
        self.set(extension_keys::ASSET_STORE, store);
    }

    /// The configured asset store, if any
    pub fn asset_store(&self) -> Option<&Arc<dyn AssetStore>> {
        self.get::<Arc<dyn AssetStore>>(extension_keys::ASSET_STORE)
    }
}

impl Default for ExecutorExtensions {
    fn default() -> Self {
        Self::new()
    }
}

/// Well-known extension keys for standard dependencies.
pub mod extension_keys {
    /// Key for `Arc<dyn AssetStore>`, used by image nodes.
    pub const ASSET_STORE: &str = "asset_store";
}
