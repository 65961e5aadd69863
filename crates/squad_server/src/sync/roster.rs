//! Roster reconciliation.

use super::SyncCycle;
use crate::collaborators::{ControlChannel, FetchedPlayer};
use crate::error::ServerError;
use crate::identity::{find_squad, RosterRefresh};
use crate::log_parser::{LogEventExtractor, LogIdentity};
use crate::state::ServerState;
use async_trait::async_trait;
use squad_event_system::{
    names, EosId, EventSystem, Player, PlayerListUpdatedEvent, PlayerNameChangeEvent, PlayerSquadChangeEvent,
    PlayerTeamChangeEvent, Squad, SteamId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// A per-field change between two roster snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterChange {
    Name { player: Player, old: String, new: String },
    Team { player: Player, old: Option<u8>, new: Option<u8> },
    Squad { player: Player, old: Option<u32>, new: Option<u32> },
}

fn same_person(a: &Player, b: &Player) -> bool {
    a.steam_id == b.steam_id || (a.eos_id.is_some() && a.eos_id == b.eos_id)
}

/// Field changes for every player present in both snapshots. Players new to
/// `new` produce nothing.
pub fn diff_rosters(old: &[Player], new: &[Player]) -> Vec<RosterChange> {
    let mut changes = Vec::new();
    for player in new {
        let Some(previous) = old.iter().find(|p| same_person(p, player)) else {
            continue;
        };
        if player.name != previous.name {
            changes.push(RosterChange::Name {
                player: player.clone(),
                old: previous.name.clone(),
                new: player.name.clone(),
            });
        }
        if player.team_id != previous.team_id {
            changes.push(RosterChange::Team {
                player: player.clone(),
                old: previous.team_id,
                new: player.team_id,
            });
        }
        if player.squad_id != previous.squad_id {
            changes.push(RosterChange::Squad {
                player: player.clone(),
                old: previous.squad_id,
                new: player.squad_id,
            });
        }
    }
    changes
}

/// Builds the canonical entry for `fetched`, carrying forward what the
/// previous entry and the log already knew.
fn merge_player(
    fetched: &FetchedPlayer,
    previous: Option<&Player>,
    log_identity: Option<&LogIdentity>,
    squads: &[Squad],
) -> Player {
    let mut player = previous
        .cloned()
        .unwrap_or_else(|| Player::minimal(fetched.steam_id, fetched.eos_id.clone(), fetched.name.clone()));

    player.steam_id = fetched.steam_id;
    if fetched.eos_id.is_some() {
        player.eos_id = fetched.eos_id.clone();
    }
    player.name = fetched.name.clone();
    player.team_id = fetched.team_id;
    player.squad_id = fetched.squad_id;
    player.is_leader = fetched.is_leader;
    player.role = fetched.role.clone();

    if let Some(identity) = log_identity {
        if identity.controller.is_some() {
            player.player_controller = identity.controller.clone();
        }
        if player.suffix.is_none() {
            player.suffix = identity.suffix.clone();
        }
    }
    player.squad = find_squad(squads, player.team_id, player.squad_id).cloned();
    player
}

/// Keeps the roster in line with the control channel.
pub struct RosterSync {
    control: Arc<dyn ControlChannel>,
    state: Arc<ServerState>,
    extractor: Arc<Mutex<LogEventExtractor>>,
    events: Arc<EventSystem>,
    /// Last known player per transient id; outlives roster removal so a late
    /// disconnect can still be attributed.
    player_info: Arc<Mutex<HashMap<EosId, Player>>>,
}

impl RosterSync {
    pub fn new(
        control: Arc<dyn ControlChannel>,
        state: Arc<ServerState>,
        extractor: Arc<Mutex<LogEventExtractor>>,
        events: Arc<EventSystem>,
        player_info: Arc<Mutex<HashMap<EosId, Player>>>,
    ) -> Self {
        Self {
            control,
            state,
            extractor,
            events,
            player_info,
        }
    }

    async fn publish_changes(&self, changes: Vec<RosterChange>) {
        for change in changes {
            let result = match change {
                RosterChange::Name { player, old, new } => {
                    self.events
                        .emit_server(
                            names::PLAYER_NAME_CHANGE,
                            &PlayerNameChangeEvent {
                                player,
                                old_name: old,
                                new_name: new,
                            },
                        )
                        .await
                }
                RosterChange::Team { player, old, new } => {
                    self.events
                        .emit_server(
                            names::PLAYER_TEAM_CHANGE,
                            &PlayerTeamChangeEvent {
                                player,
                                old_team_id: old,
                                new_team_id: new,
                            },
                        )
                        .await
                }
                RosterChange::Squad { player, old, new } => {
                    self.events
                        .emit_server(
                            names::PLAYER_SQUAD_CHANGE,
                            &PlayerSquadChangeEvent {
                                player,
                                old_squad_id: old,
                                new_squad_id: new,
                            },
                        )
                        .await
                }
            };
            if let Err(e) = result {
                error!("❌ Failed to publish roster change: {}", e);
            }
        }
    }
}

#[async_trait]
impl SyncCycle for RosterSync {
    fn name(&self) -> &'static str {
        "player list"
    }

    async fn run_cycle(&self) -> Result<(), ServerError> {
        let start = self.state.players.load().await;
        let fetched = self.control.list_players().await?;
        let squads = self.state.squads.load().await;

        let identities: HashMap<SteamId, LogIdentity> = {
            let extractor = self.extractor.lock().await;
            fetched
                .iter()
                .filter_map(|p| extractor.store().player(p.steam_id).map(|id| (p.steam_id, id.clone())))
                .collect()
        };

        // Merge against the latest roster so enrichment written by log events
        // during the fetch is carried over; diff against the cycle's start.
        let committed = self
            .state
            .players
            .update(|latest| {
                fetched
                    .iter()
                    .map(|f| {
                        let previous = latest.iter().find(|p| {
                            p.steam_id == f.steam_id || (f.eos_id.is_some() && p.eos_id == f.eos_id)
                        });
                        merge_player(f, previous, identities.get(&f.steam_id), &squads.value)
                    })
                    .collect()
            })
            .await;

        {
            let mut info = self.player_info.lock().await;
            for player in &committed.value {
                if let Some(eos_id) = &player.eos_id {
                    info.insert(eos_id.clone(), player.clone());
                }
            }
        }

        let changes = diff_rosters(&start.value, &committed.value);
        debug!(
            "👥 Roster v{} committed with {} players, {} changes",
            committed.version,
            committed.value.len(),
            changes.len()
        );
        self.publish_changes(changes).await;

        let reported = self
            .state
            .server_info
            .load()
            .await
            .value
            .as_ref()
            .map_or(0, |info| info.player_count);
        if reported > 0 && committed.value.is_empty() {
            warn!("⚠️ Server reports {} players but the roster fetch returned none", reported);
        }

        self.events
            .emit_server(
                names::UPDATED_PLAYER_INFORMATION,
                &PlayerListUpdatedEvent {
                    version: committed.version,
                    player_count: committed.value.len(),
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RosterRefresh for RosterSync {
    async fn refresh_roster(&self) -> Result<(), ServerError> {
        self.run_cycle().await
    }
}
