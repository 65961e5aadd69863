//! Current and next layer reconciliation.

use super::SyncCycle;
use crate::collaborators::ControlChannel;
use crate::config::EngineConfig;
use crate::error::ServerError;
use crate::layers::LayerCatalog;
use crate::state::ServerState;
use async_trait::async_trait;
use chrono::Utc;
use squad_event_system::{names, EventSystem, LayerInformationUpdatedEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LayerInfoSync {
    control: Arc<dyn ControlChannel>,
    catalog: Arc<LayerCatalog>,
    state: Arc<ServerState>,
    events: Arc<EventSystem>,
    config: EngineConfig,
}

impl LayerInfoSync {
    pub fn new(
        control: Arc<dyn ControlChannel>,
        catalog: Arc<LayerCatalog>,
        state: Arc<ServerState>,
        events: Arc<EventSystem>,
        config: EngineConfig,
    ) -> Self {
        Self {
            control,
            catalog,
            state,
            events,
            config,
        }
    }
}

#[async_trait]
impl SyncCycle for LayerInfoSync {
    fn name(&self) -> &'static str {
        "layer information"
    }

    async fn run_cycle(&self) -> Result<(), ServerError> {
        let start = self.state.layers.load().await;
        let current_map = self.control.current_map().await?;
        let next_map = self.control.next_map().await?;
        let next_to_be_voted = next_map.layer == self.config.vote_sentinel;

        debug!(
            "🗺️ Canonical layer {:?}, control channel reports {}",
            start.value.current_layer.as_ref().map(|l| l.name.as_str()),
            current_map.layer
        );

        let mut adopted = None;
        let known_name = start.value.current_layer.as_ref().map(|l| l.name.as_str());
        if known_name != Some(current_map.layer.as_str()) {
            match self.catalog.resolve(&current_map.layer).await {
                Some(_) if current_map.layer == self.config.training_layer_name => {
                    debug!("🗺️ Not adopting {}", current_map.layer);
                }
                Some(layer) => {
                    info!("🗺️ Control channel sets current layer to {}", layer.layer_id);
                    adopted = Some(layer);
                }
                None => {}
            }
        }

        let next_layer = if next_to_be_voted {
            None
        } else {
            self.catalog.by_name(&next_map.layer).await
        };

        let max_history = self.config.layer_history_max_length;
        let committed = self
            .state
            .layers
            .update(|latest| {
                let mut next = latest.clone();
                if let Some(layer) = adopted {
                    next.current_layer = Some(layer);
                }
                next.next_layer = next_layer;
                next.next_layer_to_be_voted = next_to_be_voted;
                if next.history.is_empty() {
                    let current = next.current_layer.clone();
                    next.push_history(current, Utc::now(), max_history);
                }
                next
            })
            .await;

        if committed.value.current_layer.is_none() {
            warn!("⚠️ Could not resolve the current layer {}", current_map.layer);
        }

        self.events
            .emit_server(
                names::UPDATED_LAYER_INFORMATION,
                &LayerInformationUpdatedEvent {
                    current_layer: committed.value.current_layer.clone(),
                    next_layer: committed.value.next_layer.clone(),
                    next_layer_to_be_voted: committed.value.next_layer_to_be_voted,
                },
            )
            .await?;
        Ok(())
    }
}
