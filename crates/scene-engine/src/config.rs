//! Engine configuration
//!
//! Values default to the constants in [`defaults`]; a JSON file can
//! override any subset of them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Default values for engine configuration
pub mod defaults {
    /// Maximum number of scene and frame outputs per graph
    pub const MAX_SCENES: usize = 8;
    /// Separator between an object id and its batch key
    pub const BATCH_ID_SEPARATOR: &str = "::";
    /// Replace unresolvable images with an empty placeholder
    pub const PLACEHOLDER_ON_ASSET_ERROR: bool = true;
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub max_scenes: usize,
    pub batch_id_separator: String,
    pub placeholder_on_asset_error: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_scenes: defaults::MAX_SCENES,
            batch_id_separator: defaults::BATCH_ID_SEPARATOR.to_string(),
            placeholder_on_asset_error: defaults::PLACEHOLDER_ON_ASSET_ERROR,
        }
    }
}

impl EngineConfig {
    /// Read configuration from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            FlowError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_scenes == 0 {
            return Err(FlowError::Config("maxScenes must be at least 1".to_string()));
        }
        if self.batch_id_separator.is_empty() {
            return Err(FlowError::Config(
                "batchIdSeparator must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Id of an object or track inside a batch partition
    pub fn partition_id(&self, id: &str, key: &str) -> String {
        format!("{}{}{}", id, self.batch_id_separator, key)
    }
}
