//! Enrichment of events framed by the control channel.

use super::handlers::EventRouter;
use crate::collaborators::ControlEvent;
use crate::error::ServerError;
use crate::identity::{Lookup, PlayerKey};
use squad_event_system::{
    names, AdminCameraEvent, ChatMessageEvent, PlayerBannedEvent, PlayerKickedEvent, PlayerWarnedEvent,
    RconErrorEvent, SquadCreatedEvent,
};
use tracing::{debug, warn};

impl EventRouter {
    pub async fn handle_control_event(&self, event: ControlEvent) -> Result<(), ServerError> {
        match event {
            ControlEvent::ChatMessage {
                chat,
                name,
                steam_id,
                eos_id,
                message,
                time,
            } => {
                let player = self.identity.by_steam_id(steam_id).await;
                let command = self.parse_command(&message);
                let mut payload = ChatMessageEvent {
                    chat,
                    name,
                    steam_id,
                    eos_id,
                    message,
                    time,
                    command: command.as_ref().map(|(word, _)| word.clone()),
                    player,
                };
                self.events.emit_server(names::CHAT_MESSAGE, &payload).await?;

                if let Some((word, rest)) = command {
                    debug!("💬 Chat command {} from {}", word, payload.name);
                    payload.message = rest;
                    self.events.emit_command(&word, &payload).await?;
                }
            }

            ControlEvent::PossessedAdminCamera { name, steam_id, time } => {
                let player = self.identity.by_steam_id(steam_id).await;
                self.admin_camera.lock().await.insert(steam_id, time);
                self.events
                    .emit_server(
                        names::POSSESSED_ADMIN_CAMERA,
                        &AdminCameraEvent {
                            name,
                            steam_id,
                            time,
                            duration_ms: None,
                            player,
                        },
                    )
                    .await?;
            }

            ControlEvent::UnpossessedAdminCamera { name, steam_id, time } => {
                let player = self.identity.by_steam_id(steam_id).await;
                let entered = self.admin_camera.lock().await.remove(&steam_id);
                let duration_ms = entered.map_or(0, |entered| (time - entered).num_milliseconds());
                self.events
                    .emit_server(
                        names::UNPOSSESSED_ADMIN_CAMERA,
                        &AdminCameraEvent {
                            name,
                            steam_id,
                            time,
                            duration_ms: Some(duration_ms),
                            player,
                        },
                    )
                    .await?;
            }

            ControlEvent::PlayerWarned { name, reason, time } => {
                let player = self.identity.by_name(&name).await;
                self.events
                    .emit_server(
                        names::PLAYER_WARNED,
                        &PlayerWarnedEvent {
                            name,
                            reason,
                            time,
                            player,
                        },
                    )
                    .await?;
            }

            ControlEvent::PlayerKicked {
                player_id,
                steam_id,
                name,
                time,
            } => {
                let player = self.identity.by_steam_id(steam_id).await;
                self.events
                    .emit_server(
                        names::PLAYER_KICKED,
                        &PlayerKickedEvent {
                            player_id,
                            steam_id,
                            name,
                            time,
                            player,
                        },
                    )
                    .await?;
            }

            ControlEvent::PlayerBanned {
                player_id,
                steam_id,
                name,
                interval,
                time,
            } => {
                let player = self.identity.by_steam_id(steam_id).await;
                self.events
                    .emit_server(
                        names::PLAYER_BANNED,
                        &PlayerBannedEvent {
                            player_id,
                            steam_id,
                            name,
                            interval,
                            time,
                            player,
                        },
                    )
                    .await?;
            }

            ControlEvent::SquadCreated {
                player_name,
                player_steam_id,
                squad_id,
                squad_name,
                team_name,
                time,
            } => {
                let mut player = self
                    .identity
                    .resolve(PlayerKey::SteamId(player_steam_id), Lookup::Retry)
                    .await;
                match player.as_mut() {
                    Some(player) => player.squad_id = Some(squad_id),
                    None => warn!("⚠️ Squad {} created by unknown player {}", squad_name, player_name),
                }
                self.events
                    .emit_server(
                        names::SQUAD_CREATED,
                        &SquadCreatedEvent {
                            squad_id,
                            squad_name,
                            team_name,
                            time,
                            player,
                        },
                    )
                    .await?;
            }

            ControlEvent::RconError { message, time } => {
                warn!("⚠️ Control channel error: {}", message);
                self.events
                    .emit_server(names::RCON_ERROR, &RconErrorEvent { message, time })
                    .await?;
            }
        }
        Ok(())
    }
}
