//! The layer catalog and its reconciliation with the live server.
//!
//! The catalog is pulled lazily from a [`LayerSource`] the first time it is
//! needed. A forced pull rebuilds the whole table from a fresh fetch; entries
//! are never patched across pulls. A failed fetch leaves the table as it was.

pub mod grammar;

pub use grammar::{parse_layer_name, synthesize_layer, LayerName};

use crate::collaborators::LayerSource;
use crate::error::CatalogError;
use squad_event_system::Layer;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct CatalogTable {
    /// Insertion order is kept; condition lookups return the first match.
    layers: Vec<Layer>,
    pulled: bool,
}

/// Outcome of [`LayerCatalog::reconcile_with_live`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<String>,
    pub synthesized: Vec<String>,
    pub skipped: Vec<String>,
}

/// In-memory table of known layers.
pub struct LayerCatalog {
    source: Arc<dyn LayerSource>,
    table: RwLock<CatalogTable>,
    /// Serializes fetches so readers are never blocked behind the source.
    pulling: Mutex<()>,
}

impl std::fmt::Debug for LayerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerCatalog").field("source", &"[source]").finish()
    }
}

/// Classnames compare with the first underscore removed, case-insensitively.
fn normalize_classname(classname: &str) -> String {
    classname.replacen('_', "", 1).to_lowercase()
}

impl LayerCatalog {
    pub fn new(source: Arc<dyn LayerSource>) -> Self {
        Self {
            source,
            table: RwLock::new(CatalogTable::default()),
            pulling: Mutex::new(()),
        }
    }

    /// Fetches the catalog unless it was already pulled. `force` fetches again
    /// and replaces the table once the fetch succeeded. Returns the number of
    /// layers held.
    pub async fn pull(&self, force: bool) -> Result<usize, CatalogError> {
        let _pulling = self.pulling.lock().await;
        {
            let table = self.table.read().await;
            if table.pulled && !force {
                debug!("🗺️ Layer catalog already pulled");
                return Ok(table.layers.len());
            }
        }
        if force {
            info!("🗺️ Forcing layer catalog refresh");
        }

        let fetched = self.source.fetch().await?;
        let mut seen = HashSet::new();
        let mut layers = Vec::with_capacity(fetched.len());
        for layer in fetched {
            if seen.insert(layer.layer_id.clone()) {
                layers.push(layer);
            } else {
                debug!("🗺️ Duplicate catalog layer {} ignored", layer.layer_id);
            }
        }

        let count = layers.len();
        *self.table.write().await = CatalogTable { layers, pulled: true };
        info!("🗺️ Pulled {} layers", count);
        Ok(count)
    }

    async fn ensure_pulled(&self) {
        if self.table.read().await.pulled {
            return;
        }
        if let Err(e) = self.pull(false).await {
            warn!("⚠️ Layer catalog unavailable: {}", e);
        }
    }

    /// Snapshot of every layer, in catalog order.
    pub async fn layers(&self) -> Vec<Layer> {
        self.table.read().await.layers.clone()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.layers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.layers.is_empty()
    }

    async fn first_match<F>(&self, predicate: F) -> Option<Layer>
    where
        F: Fn(&Layer) -> bool,
    {
        self.ensure_pulled().await;
        self.table.read().await.layers.iter().find(|l| predicate(l)).cloned()
    }

    pub async fn by_id(&self, layer_id: &str) -> Option<Layer> {
        self.first_match(|l| l.layer_id == layer_id).await
    }

    pub async fn by_name(&self, name: &str) -> Option<Layer> {
        self.first_match(|l| l.name == name).await
    }

    pub async fn by_classname(&self, classname: &str) -> Option<Layer> {
        let wanted = normalize_classname(classname);
        self.first_match(|l| normalize_classname(&l.classname) == wanted).await
    }

    /// Resolves a live map identifier: by name, then id, then classname.
    pub async fn resolve(&self, identifier: &str) -> Option<Layer> {
        if let Some(layer) = self.by_name(identifier).await {
            return Some(layer);
        }
        if let Some(layer) = self.by_id(identifier).await {
            return Some(layer);
        }
        self.by_classname(identifier).await
    }

    /// Makes the catalog agree with the layers the server actually offers.
    ///
    /// Catalog entries absent from `live_ids` are removed. Live identifiers the
    /// catalog lacks are synthesized from their name; identifiers that do not
    /// parse are skipped.
    pub async fn reconcile_with_live(&self, live_ids: &[String]) -> ReconcileReport {
        let live: HashSet<&str> = live_ids.iter().map(String::as_str).collect();
        let mut report = ReconcileReport::default();
        let mut table = self.table.write().await;

        let mut kept = Vec::with_capacity(table.layers.len());
        for layer in table.layers.drain(..) {
            if live.contains(layer.layer_id.as_str()) {
                kept.push(layer);
            } else {
                report.removed.push(layer.layer_id);
            }
        }
        table.layers = kept;

        for id in live_ids {
            if table.layers.iter().any(|l| &l.layer_id == id) {
                continue;
            }
            match synthesize_layer(id) {
                Some(layer) => {
                    if table.layers.iter().any(|l| l.layer_id == layer.layer_id) {
                        continue;
                    }
                    debug!("🗺️ Synthesized layer {} from live identifier", layer.layer_id);
                    report.synthesized.push(layer.layer_id.clone());
                    table.layers.push(layer);
                }
                None => {
                    debug!("🗺️ Live layer {} does not parse, skipped", id);
                    report.skipped.push(id.clone());
                }
            }
        }

        info!(
            "🗺️ Catalog reconciled: {} layers, {} removed, {} synthesized, {} skipped",
            table.layers.len(),
            report.removed.len(),
            report.synthesized.len(),
            report.skipped.len()
        );
        report
    }
}

/// Layer ids from a `ListLayers` response: the first line is a header, every
/// other line starts with the id.
pub fn parse_layer_listing(response: &str) -> Vec<String> {
    response
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
