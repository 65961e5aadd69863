//! Canonical server state.
//!
//! Each collection lives behind a single [`StateCell`]. Writers build the next
//! value off to the side and swap it in as a whole; readers get an `Arc` to a
//! complete, versioned snapshot and never see a half-applied update.

use crate::admins::{AdminIndex, AdminPermissions};
use chrono::{DateTime, Utc};
use squad_event_system::{Layer, LayerHistoryEntry, Player, ServerInfo, Squad, SteamId};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An immutable value tagged with the write that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub version: u64,
    pub value: T,
}

/// Replace-on-write cell holding one snapshot.
#[derive(Debug)]
pub struct StateCell<T> {
    current: RwLock<Arc<Snapshot<T>>>,
}

impl<T> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot { version: 0, value })),
        }
    }

    /// Returns the current snapshot.
    pub async fn load(&self) -> Arc<Snapshot<T>> {
        self.current.read().await.clone()
    }

    /// Swaps in `value` and returns the new snapshot.
    pub async fn replace(&self, value: T) -> Arc<Snapshot<T>> {
        let mut guard = self.current.write().await;
        let next = Arc::new(Snapshot {
            version: guard.version + 1,
            value,
        });
        *guard = next.clone();
        next
    }

    /// Computes the next value from the latest one and swaps it in. No other
    /// writer can commit between reading `latest` and the swap.
    pub async fn update<F>(&self, f: F) -> Arc<Snapshot<T>>
    where
        F: FnOnce(&T) -> T,
    {
        let mut guard = self.current.write().await;
        let next = Arc::new(Snapshot {
            version: guard.version + 1,
            value: f(&guard.value),
        });
        *guard = next.clone();
        next
    }
}

/// Current/next layer and the played history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerState {
    pub current_layer: Option<Layer>,
    pub next_layer: Option<Layer>,
    pub next_layer_to_be_voted: bool,
    /// Most recent first.
    pub history: Vec<LayerHistoryEntry>,
}

impl LayerState {
    /// Pushes `layer` onto the front of the history, keeping at most `max`.
    pub fn push_history(&mut self, layer: Option<Layer>, time: DateTime<Utc>, max: usize) {
        self.history.insert(0, LayerHistoryEntry { layer, time });
        self.history.truncate(max);
    }
}

/// Everything the engine knows about the server right now.
#[derive(Debug)]
pub struct ServerState {
    pub players: StateCell<Vec<Player>>,
    pub squads: StateCell<Vec<Squad>>,
    pub layers: StateCell<LayerState>,
    pub server_info: StateCell<Option<ServerInfo>>,
    pub admins: StateCell<AdminIndex>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            players: StateCell::new(Vec::new()),
            squads: StateCell::new(Vec::new()),
            layers: StateCell::new(LayerState::default()),
            server_info: StateCell::new(None),
            admins: StateCell::new(AdminIndex::new()),
        }
    }

    /// Applies `patch` to the roster entry with `steam_id`, if any, and
    /// returns the patched player.
    pub async fn patch_player<F>(&self, steam_id: SteamId, patch: F) -> Option<Player>
    where
        F: FnOnce(&mut Player),
    {
        let mut patched = None;
        let mut patch = Some(patch);
        self.players
            .update(|players| {
                players
                    .iter()
                    .cloned()
                    .map(|mut player| {
                        if player.steam_id == steam_id {
                            if let Some(f) = patch.take() {
                                f(&mut player);
                                patched = Some(player.clone());
                            }
                        }
                        player
                    })
                    .collect()
            })
            .await;
        patched
    }

    pub async fn admin_permissions(&self, steam_id: SteamId) -> Option<AdminPermissions> {
        self.admins.load().await.value.get(&steam_id).cloned()
    }

    /// Every admin granted `permission`, in steam id order.
    pub async fn admins_with_permission(&self, permission: &str) -> Vec<SteamId> {
        let permission = permission.to_lowercase();
        let admins = self.admins.load().await;
        let mut found: Vec<SteamId> = admins
            .value
            .iter()
            .filter(|(_, perms)| perms.contains(&permission))
            .map(|(steam_id, _)| *steam_id)
            .collect();
        found.sort();
        found
    }
}
