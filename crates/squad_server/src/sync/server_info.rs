//! Server information reconciliation via the `ShowServerInfo` query.

use super::SyncCycle;
use crate::collaborators::ControlChannel;
use crate::error::{ControlError, ServerError};
use crate::layers::LayerCatalog;
use crate::state::ServerState;
use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::Value;
use squad_event_system::{names, EventSystem, ServerInfo, ServerInformationUpdatedEvent};
use std::sync::Arc;
use tracing::{debug, info, trace};

pub const SERVER_INFO_COMMAND: &str = "ShowServerInfo";

/// Integer field that may arrive as a number or a numeric string.
fn int_field(data: &Value, key: &str) -> u32 {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_f64().map_or(0, |v| v.max(0.0) as u32),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_or(0, |v| v.max(0.0) as u32),
        _ => 0,
    }
}

fn float_field(data: &Value, key: &str) -> f64 {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn string_field(data: &Value, key: &str) -> String {
    data.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Team names are reported with the map name glued on; strip it once.
fn strip_map_name(team: &str, map_name: &str) -> String {
    if map_name.is_empty() {
        return team.to_string();
    }
    match RegexBuilder::new(&regex::escape(map_name)).case_insensitive(true).build() {
        Ok(pattern) => pattern.replace(team, "").into_owned(),
        Err(_) => team.to_string(),
    }
}

/// Parses the JSON answer of the server-information query.
pub fn parse_server_info(raw: &str) -> Result<ServerInfo, ControlError> {
    let data: Value =
        serde_json::from_str(raw).map_err(|e| ControlError::MalformedResponse(format!("server info: {e}")))?;
    if !data.is_object() {
        return Err(ControlError::MalformedResponse("server info is not an object".to_string()));
    }

    let map_name = string_field(&data, "MapName_s");
    let max_players = int_field(&data, "MaxPlayers");
    let reserve_slots = int_field(&data, "PlayerReserveCount_I");

    Ok(ServerInfo {
        server_name: string_field(&data, "ServerName_s"),
        max_players,
        public_queue_limit: int_field(&data, "PublicQueueLimit_I"),
        reserve_slots,
        public_slots: max_players.saturating_sub(reserve_slots),
        player_count: int_field(&data, "PlayerCount_I"),
        public_queue: int_field(&data, "PublicQueue_I"),
        reserve_queue: int_field(&data, "ReservedQueue_I"),
        current_layer: map_name.clone(),
        next_layer: string_field(&data, "NextLayer_s"),
        team_one: strip_map_name(&string_field(&data, "TeamOne_s"), &map_name),
        team_two: strip_map_name(&string_field(&data, "TeamTwo_s"), &map_name),
        match_timeout: float_field(&data, "MatchTimeout_d"),
        game_version: string_field(&data, "GameVersion_s"),
        raw: data,
    })
}

pub struct ServerInfoSync {
    control: Arc<dyn ControlChannel>,
    catalog: Arc<LayerCatalog>,
    state: Arc<ServerState>,
    events: Arc<EventSystem>,
}

impl ServerInfoSync {
    pub fn new(
        control: Arc<dyn ControlChannel>,
        catalog: Arc<LayerCatalog>,
        state: Arc<ServerState>,
        events: Arc<EventSystem>,
    ) -> Self {
        Self {
            control,
            catalog,
            state,
            events,
        }
    }
}

#[async_trait]
impl SyncCycle for ServerInfoSync {
    fn name(&self) -> &'static str {
        "server information"
    }

    async fn run_cycle(&self) -> Result<(), ServerError> {
        let start = self.state.layers.load().await;
        let raw = self.control.execute(SERVER_INFO_COMMAND).await?;
        trace!("📡 Raw server info: {}", raw);
        let info = parse_server_info(&raw)?;

        let known_id = start.value.current_layer.as_ref().map(|l| l.layer_id.as_str());
        if known_id != Some(info.current_layer.as_str()) {
            if let Some(layer) = self.catalog.by_id(&info.current_layer).await {
                info!("🗺️ Server information sets current layer to {}", layer.layer_id);
                self.state
                    .layers
                    .update(|latest| {
                        let mut next = latest.clone();
                        next.current_layer = Some(layer);
                        next
                    })
                    .await;
            }
        }

        debug!(
            "📡 {}: {}/{} players, queue {}+{}",
            info.server_name, info.player_count, info.max_players, info.public_queue, info.reserve_queue
        );
        self.state.server_info.replace(Some(info.clone())).await;

        self.events
            .emit_server(names::UPDATED_SERVER_INFORMATION, &ServerInformationUpdatedEvent { info })
            .await?;
        Ok(())
    }
}
