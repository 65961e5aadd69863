//! The enrichment router shared by the control and log ingestion paths.

use crate::admins::AdminDirectory;
use crate::collaborators::ControlChannel;
use crate::config::EngineConfig;
use crate::identity::IdentityResolver;
use crate::layers::LayerCatalog;
use crate::state::ServerState;
use chrono::{DateTime, Utc};
use regex::Regex;
use squad_event_system::{EosId, EventSystem, Player, SteamId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Resolves identities on raw events and republishes them on the bus.
pub struct EventRouter {
    pub(super) config: EngineConfig,
    pub(super) events: Arc<EventSystem>,
    pub(super) identity: Arc<IdentityResolver>,
    pub(super) catalog: Arc<LayerCatalog>,
    pub(super) state: Arc<ServerState>,
    pub(super) control: Arc<dyn ControlChannel>,
    pub(super) admins: Arc<AdminDirectory>,
    /// Entry time of everyone currently in the admin camera.
    pub(super) admin_camera: Mutex<HashMap<SteamId, DateTime<Utc>>>,
    pub(super) player_info: Arc<Mutex<HashMap<EosId, Player>>>,
    command_pattern: Option<Regex>,
}

impl EventRouter {
    pub fn new(
        config: EngineConfig,
        events: Arc<EventSystem>,
        identity: Arc<IdentityResolver>,
        catalog: Arc<LayerCatalog>,
        state: Arc<ServerState>,
        control: Arc<dyn ControlChannel>,
        admins: Arc<AdminDirectory>,
        player_info: Arc<Mutex<HashMap<EosId, Player>>>,
    ) -> Self {
        let pattern = format!("{}([^ ]+) ?(.*)", regex::escape(&config.command_prefix));
        let command_pattern = match Regex::new(&pattern) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                error!("❌ Chat commands disabled, bad prefix {:?}: {}", config.command_prefix, e);
                None
            }
        };
        Self {
            config,
            events,
            identity,
            catalog,
            state,
            control,
            admins,
            admin_camera: Mutex::new(HashMap::new()),
            player_info,
            command_pattern,
        }
    }

    /// Splits a chat line into its lowercased command word and the trimmed
    /// remainder.
    pub fn parse_command(&self, message: &str) -> Option<(String, String)> {
        let caps = self.command_pattern.as_ref()?.captures(message)?;
        let word = caps.get(1)?.as_str().to_lowercase();
        let rest = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
        Some((word, rest))
    }
}
