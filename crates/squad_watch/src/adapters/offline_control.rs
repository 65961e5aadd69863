//! A control channel for running without a server connection.
//!
//! Every query fails with [`ControlError::NotConnected`], so the
//! reconciliation loops log and re-arm while log-driven events keep flowing.
//! The id index still works since log lines feed it.

use async_trait::async_trait;
use squad_event_system::{EosId, Squad, SteamId};
use squad_server::{ControlChannel, ControlError, ControlEvent, FetchedPlayer, MapInfo};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub struct OfflineControlChannel {
    ids: RwLock<HashMap<EosId, SteamId>>,
    events: broadcast::Sender<ControlEvent>,
}

impl Default for OfflineControlChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineControlChannel {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            ids: RwLock::new(HashMap::new()),
            events,
        }
    }
}

#[async_trait]
impl ControlChannel for OfflineControlChannel {
    async fn connect(&self) -> Result<(), ControlError> {
        warn!("⚠️ No control channel configured, running on the server log only");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ControlError> {
        info!("🔌 Offline control channel closed");
        Ok(())
    }

    async fn execute(&self, _command: &str) -> Result<String, ControlError> {
        Err(ControlError::NotConnected)
    }

    async fn list_players(&self) -> Result<Vec<FetchedPlayer>, ControlError> {
        Err(ControlError::NotConnected)
    }

    async fn list_squads(&self) -> Result<Vec<Squad>, ControlError> {
        Err(ControlError::NotConnected)
    }

    async fn current_map(&self) -> Result<MapInfo, ControlError> {
        Err(ControlError::NotConnected)
    }

    async fn next_map(&self) -> Result<MapInfo, ControlError> {
        Err(ControlError::NotConnected)
    }

    fn add_ids(&self, steam_id: SteamId, eos_id: &EosId) {
        match self.ids.write() {
            Ok(mut ids) => {
                ids.insert(eos_id.clone(), steam_id);
            }
            Err(e) => warn!("⚠️ Id index unavailable: {}", e),
        }
    }

    fn steam_id_for(&self, eos_id: &EosId) -> Option<SteamId> {
        self.ids.read().ok()?.get(eos_id).copied()
    }

    async fn warn(&self, _target: &str, _message: &str) -> Result<(), ControlError> {
        Err(ControlError::NotConnected)
    }

    async fn kick(&self, _target: &str, _reason: &str) -> Result<(), ControlError> {
        Err(ControlError::NotConnected)
    }

    async fn ban(&self, _target: &str, _interval: &str, _reason: &str) -> Result<(), ControlError> {
        Err(ControlError::NotConnected)
    }

    fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }
}
