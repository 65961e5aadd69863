//! Enrichment of events extracted from the server log.

use super::handlers::EventRouter;
use crate::error::ServerError;
use crate::log_parser::{CheatProbability, DamageLine, LineHeader, LogEvent, TeamOutcome};
use chrono::{DateTime, NaiveDateTime, Utc};
use squad_event_system::{
    names, AdminBroadcastEvent, DeployableDamagedEvent, EosId, NewGameEvent, Player, PlayerCheatEvent,
    PlayerConnectedEvent, PlayerDamageEvent, PlayerDisconnectedEvent, PlayerPossessEvent, PlayerRevivedEvent,
    PlayerUnpossessEvent, RoundEndedEvent, TickRateEvent,
};
use tracing::{debug, info, warn};

const REMOTE_ACTIONS: &str = "Remote Actions";
const EXPLOSION_ATTACK: &str = "Explosion attack";
const UNLIKELY: &str = "unlikely";
const UNLIKELY_COLOR: u32 = 0xffff00;

/// Log timestamps look like `2023.10.08-17.42.11:517`.
fn log_time(time: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(time, "%Y.%m.%d-%H.%M.%S:%3f")
        .map(|t| t.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DamageKind {
    Damaged,
    Wounded,
    Died,
}

impl EventRouter {
    pub async fn handle_log_event(&self, event: LogEvent) -> Result<(), ServerError> {
        match event {
            LogEvent::AdminBroadcast { header, message, from } => {
                self.events
                    .emit_server(
                        names::ADMIN_BROADCAST,
                        &AdminBroadcastEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            message,
                            from,
                        },
                    )
                    .await?;
            }

            LogEvent::DeployableDamaged {
                header,
                deployable,
                damage,
                weapon,
                player_suffix,
                damage_type,
                health_remaining,
            } => {
                let player = self.identity.by_suffix(&player_suffix).await;
                self.events
                    .emit_server(
                        names::DEPLOYABLE_DAMAGED,
                        &DeployableDamagedEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            deployable,
                            damage,
                            weapon,
                            damage_type,
                            health_remaining,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::NewGame {
                header,
                dlc,
                map_classname,
                layer_classname,
            } => self.handle_new_game(header, dlc, map_classname, layer_classname).await?,

            LogEvent::RoundEnded { header, winner, loser } => self.handle_round_ended(header, winner, loser).await?,

            LogEvent::PlayerConnected {
                header,
                ip,
                eos_id,
                steam_id,
                player_suffix,
                player_controller,
            } => {
                self.control.add_ids(steam_id, &eos_id);

                let player = match self.identity.by_eos_id(Some(&eos_id)).await {
                    Some(found) => {
                        let controller = player_controller.clone();
                        let suffix = player_suffix.clone();
                        self.state
                            .patch_player(found.steam_id, move |p| {
                                p.suffix = Some(suffix);
                                if p.player_controller.is_none() {
                                    p.player_controller = controller;
                                }
                            })
                            .await
                            .unwrap_or(found)
                    }
                    None => {
                        debug!("👤 {} not in the roster yet, using the log identity", player_suffix);
                        let mut minimal = Player::minimal(steam_id, Some(eos_id), player_suffix.clone());
                        minimal.suffix = Some(player_suffix);
                        minimal.player_controller = player_controller.clone();
                        minimal
                    }
                };

                info!("👋 {} connected", player.name);
                self.events
                    .emit_server(
                        names::PLAYER_CONNECTED,
                        &PlayerConnectedEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            ip,
                            player_controller,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::PlayerDisconnected {
                header,
                ip,
                player_controller,
                eos_id,
            } => {
                let cached = self.player_info.lock().await.remove(&eos_id);
                let player = match self.identity.by_eos_id(Some(&eos_id)).await {
                    Some(player) => Some(player),
                    None => cached.or_else(|| {
                        self.control
                            .steam_id_for(&eos_id)
                            .map(|steam_id| Player::minimal(steam_id, Some(eos_id.clone()), ""))
                    }),
                };
                if player.is_none() {
                    warn!("⚠️ Disconnect of unknown transient id {}", eos_id);
                }

                self.events
                    .emit_server(
                        names::PLAYER_DISCONNECTED,
                        &PlayerDisconnectedEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            ip,
                            eos_id,
                            player_controller,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::PlayerDamaged(line) => self.handle_damage(DamageKind::Damaged, line).await?,
            LogEvent::PlayerWounded(line) => self.handle_damage(DamageKind::Wounded, line).await?,
            LogEvent::PlayerDied(line) => self.handle_damage(DamageKind::Died, line).await?,

            LogEvent::PlayerRevived {
                header,
                reviver_name,
                reviver_eos_id,
                victim_name,
                victim_eos_id,
            } => {
                let reviver = self.identity.by_eos_id(Some(&reviver_eos_id)).await;
                let victim = self.identity.by_eos_id(Some(&victim_eos_id)).await;
                self.events
                    .emit_server(
                        names::PLAYER_REVIVED,
                        &PlayerRevivedEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            reviver_name,
                            victim_name,
                            reviver,
                            victim,
                        },
                    )
                    .await?;
            }

            LogEvent::PlayerPossess {
                header,
                player_suffix,
                eos_id,
                possess_classname,
                character_classname,
            } => {
                let mut player = self.possessor(eos_id.as_ref(), &player_suffix).await;
                if let Some(found) = player.take() {
                    let possess = possess_classname.clone();
                    let character = character_classname.clone();
                    player = Some(
                        self.state
                            .patch_player(found.steam_id, move |p| {
                                p.possess_classname = Some(possess);
                                p.character_classname = Some(character);
                            })
                            .await
                            .unwrap_or(found),
                    );
                }
                self.events
                    .emit_server(
                        names::PLAYER_POSSESS,
                        &PlayerPossessEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            player_suffix,
                            possess_classname,
                            character_classname,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::PlayerUnpossess {
                header,
                player_suffix,
                eos_id,
                switch_possess,
            } => {
                let mut player = self.possessor(eos_id.as_ref(), &player_suffix).await;
                // A switch unpossesses the old body after the new one was
                // possessed in the same chain; the new body stays current.
                let released = if switch_possess { None } else { player.take() };
                if let Some(found) = released {
                    player = Some(
                        self.state
                            .patch_player(found.steam_id, |p| {
                                p.possess_classname = None;
                                p.character_classname = None;
                            })
                            .await
                            .unwrap_or(found),
                    );
                }
                self.events
                    .emit_server(
                        names::PLAYER_UNPOSSESS,
                        &PlayerUnpossessEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            player_suffix,
                            switch_possess,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::TickRate { header, tick_rate } => {
                self.events
                    .emit_server(
                        names::TICK_RATE,
                        &TickRateEvent {
                            raw: header.raw,
                            time: header.time,
                            chain_id: header.chain_id,
                            tick_rate,
                        },
                    )
                    .await?;
            }

            LogEvent::MovementAnomaly {
                header,
                character_name,
                probability,
            } => {
                let player = self.identity.by_classname(&character_name).await;
                let (probability, probability_color) = match probability {
                    CheatProbability::High => (None, None),
                    CheatProbability::Unlikely => (Some(UNLIKELY.to_string()), Some(UNLIKELY_COLOR)),
                };
                warn!("🚨 Movement anomaly on {}", character_name);
                self.events
                    .emit_server(
                        names::PLAYER_CHEAT,
                        &PlayerCheatEvent {
                            raw: header.raw,
                            time: header.time,
                            raw_id: character_name,
                            cheat_type: REMOTE_ACTIONS.to_string(),
                            probability,
                            probability_color,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::ExplosionAttack { header, instigator } => {
                let player = self.identity.by_controller(Some(&instigator)).await;
                warn!("🚨 Repeated explosion traces from {}", instigator);
                self.events
                    .emit_server(
                        names::PLAYER_CHEAT,
                        &PlayerCheatEvent {
                            raw: header.raw,
                            time: header.time,
                            raw_id: instigator,
                            cheat_type: EXPLOSION_ATTACK.to_string(),
                            probability: None,
                            probability_color: None,
                            player,
                        },
                    )
                    .await?;
            }

            LogEvent::ExternalAccountInfo { eos_id, steam_id, .. } => {
                debug!("🔗 Linking {} to {}", eos_id, steam_id);
                self.control.add_ids(steam_id, &eos_id);
            }
        }
        Ok(())
    }

    async fn possessor(&self, eos_id: Option<&EosId>, suffix: &str) -> Option<Player> {
        match self.identity.by_eos_id(eos_id).await {
            Some(player) => Some(player),
            None => self.identity.by_suffix(suffix).await,
        }
    }

    async fn handle_new_game(
        &self,
        header: LineHeader,
        dlc: String,
        map_classname: String,
        layer_classname: String,
    ) -> Result<(), ServerError> {
        let layer = self.catalog.by_classname(&layer_classname).await;
        match &layer {
            Some(layer) => info!("🎮 New game on {}", layer.layer_id),
            None => warn!("⚠️ New game on unknown layer classname {}", layer_classname),
        }

        let max_history = self.config.layer_history_max_length;
        let time = log_time(&header.time);
        let adopted = layer.clone();
        self.state
            .layers
            .update(move |latest| {
                let mut next = latest.clone();
                if adopted.is_some() {
                    next.current_layer = adopted.clone();
                }
                next.push_history(adopted, time, max_history);
                next
            })
            .await;

        if let Err(e) = self.admins.refresh().await {
            warn!("⚠️ Keeping previous admin lists: {}", e);
        }

        self.events
            .emit_server(
                names::NEW_GAME,
                &NewGameEvent {
                    raw: header.raw,
                    time: header.time,
                    chain_id: header.chain_id,
                    dlc,
                    map_classname,
                    layer_classname,
                    layer,
                },
            )
            .await?;
        Ok(())
    }

    async fn handle_round_ended(
        &self,
        header: LineHeader,
        winner: Option<TeamOutcome>,
        loser: Option<TeamOutcome>,
    ) -> Result<(), ServerError> {
        let raw_layer = winner.as_ref().or(loser.as_ref()).map(|t| t.layer.clone());
        let raw_level = winner.as_ref().or(loser.as_ref()).map(|t| t.level.clone());
        let layer = match &raw_layer {
            Some(identifier) => self.catalog.resolve(identifier).await,
            None => None,
        };

        info!(
            "🏁 Round ended, winner team {:?} with {:?} tickets",
            winner.as_ref().map(|w| w.team),
            winner.as_ref().map(|w| w.tickets)
        );
        self.events
            .emit_server(
                names::ROUND_ENDED,
                &RoundEndedEvent {
                    raw: header.raw,
                    time: header.time,
                    winner_id: winner.as_ref().map(|w| w.team),
                    winner_faction: winner.as_ref().map(|w| w.faction.clone()),
                    winner_tickets: winner.as_ref().map(|w| w.tickets),
                    loser_id: loser.as_ref().map(|l| l.team),
                    loser_faction: loser.as_ref().map(|l| l.faction.clone()),
                    loser_tickets: loser.as_ref().map(|l| l.tickets),
                    raw_layer,
                    raw_level,
                    layer,
                },
            )
            .await?;
        Ok(())
    }

    async fn handle_damage(&self, kind: DamageKind, line: DamageLine) -> Result<(), ServerError> {
        let victim = self.identity.by_name(&line.victim_name).await;
        let mut attacker = match self.identity.by_eos_id(Some(&line.attacker_eos_id)).await {
            Some(attacker) => Some(attacker),
            None => self.identity.by_controller(line.attacker_controller.as_deref()).await,
        };

        let missing_controller = match (&attacker, &line.attacker_controller) {
            (Some(found), Some(controller)) if found.player_controller.is_none() => {
                Some((found.steam_id, controller.clone()))
            }
            _ => None,
        };
        if let (DamageKind::Damaged, Some((steam_id, controller))) = (kind, missing_controller) {
            if let Some(patched) = self
                .state
                .patch_player(steam_id, move |p| p.player_controller = Some(controller))
                .await
            {
                attacker = Some(patched);
            }
        }

        let teamkill = match (&victim, &attacker) {
            (Some(victim), Some(attacker)) => victim.is_teammate_of(attacker),
            _ => false,
        };

        let payload = PlayerDamageEvent {
            raw: line.header.raw,
            time: line.header.time,
            chain_id: line.header.chain_id,
            victim_name: line.victim_name,
            damage: line.damage,
            attacker_name: line.attacker_name,
            attacker_eos_id: Some(line.attacker_eos_id),
            attacker_steam_id: Some(line.attacker_steam_id),
            attacker_controller: line.attacker_controller,
            weapon: line.weapon,
            victim,
            attacker,
            teamkill,
        };

        match kind {
            DamageKind::Damaged => self.events.emit_server(names::PLAYER_DAMAGED, &payload).await?,
            DamageKind::Wounded => {
                self.events.emit_server(names::PLAYER_WOUNDED, &payload).await?;
                if teamkill {
                    warn!("🔫 Teamkill on {} with {}", payload.victim_name, payload.weapon);
                    self.events.emit_server(names::TEAMKILL, &payload).await?;
                }
            }
            DamageKind::Died => self.events.emit_server(names::PLAYER_DIED, &payload).await?,
        }
        Ok(())
    }
}
