//! Layer catalog read from a local JSON file.

use async_trait::async_trait;
use squad_event_system::Layer;
use squad_server::{CatalogError, LayerSource};
use std::path::PathBuf;
use tracing::debug;

/// Reads a JSON array of layers. The file is re-read on every fetch so a
/// forced catalog refresh picks up edits.
pub struct JsonFileLayerSource {
    path: PathBuf,
}

impl JsonFileLayerSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl LayerSource for JsonFileLayerSource {
    async fn fetch(&self) -> Result<Vec<Layer>, CatalogError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::Fetch(format!("{}: {}", self.path.display(), e)))?;
        let layers: Vec<Layer> =
            serde_json::from_str(&content).map_err(|e| CatalogError::Decode(e.to_string()))?;
        debug!("🗺️ Read {} layers from {}", layers.len(), self.path.display());
        Ok(layers)
    }
}
