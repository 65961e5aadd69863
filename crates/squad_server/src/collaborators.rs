//! Interfaces of the external systems the engine drives.
//!
//! The engine never speaks a wire protocol itself. It is handed a
//! [`ControlChannel`], a [`LogReader`] and a [`LayerSource`] at construction,
//! optionally an [`AdminSource`] later, and only ever talks to them through
//! these traits.

use crate::error::{AdminListError, CatalogError, ControlError, LogReaderError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use squad_event_system::{EosId, Layer, Squad, SteamId};
use tokio::sync::{broadcast, mpsc};

/// One row of the control channel's player listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPlayer {
    pub steam_id: SteamId,
    pub eos_id: Option<EosId>,
    pub name: String,
    pub team_id: Option<u8>,
    pub squad_id: Option<u32>,
    pub is_leader: bool,
    pub role: Option<String>,
}

/// Current or next map as reported by the control channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MapInfo {
    pub level: String,
    pub layer: String,
}

/// Events the control channel has already framed from its own stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    ChatMessage {
        chat: String,
        name: String,
        steam_id: SteamId,
        eos_id: Option<EosId>,
        message: String,
        time: DateTime<Utc>,
    },
    PossessedAdminCamera {
        name: String,
        steam_id: SteamId,
        time: DateTime<Utc>,
    },
    UnpossessedAdminCamera {
        name: String,
        steam_id: SteamId,
        time: DateTime<Utc>,
    },
    PlayerWarned {
        name: String,
        reason: String,
        time: DateTime<Utc>,
    },
    PlayerKicked {
        player_id: String,
        steam_id: SteamId,
        name: String,
        time: DateTime<Utc>,
    },
    PlayerBanned {
        player_id: String,
        steam_id: SteamId,
        name: String,
        interval: String,
        time: DateTime<Utc>,
    },
    SquadCreated {
        player_name: String,
        player_steam_id: SteamId,
        squad_id: u32,
        squad_name: String,
        team_name: String,
        time: DateTime<Utc>,
    },
    /// Transport-level fault; republished so an operator plugin can react.
    RconError {
        message: String,
        time: DateTime<Utc>,
    },
}

/// Polled and commanded channel to the game server.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    async fn connect(&self) -> Result<(), ControlError>;

    async fn disconnect(&self) -> Result<(), ControlError>;

    /// Runs a raw command and returns the response text.
    async fn execute(&self, command: &str) -> Result<String, ControlError>;

    async fn list_players(&self) -> Result<Vec<FetchedPlayer>, ControlError>;

    async fn list_squads(&self) -> Result<Vec<Squad>, ControlError>;

    async fn current_map(&self) -> Result<MapInfo, ControlError>;

    async fn next_map(&self) -> Result<MapInfo, ControlError>;

    /// Records a stable/transient id pair observed outside the channel.
    fn add_ids(&self, steam_id: SteamId, eos_id: &EosId);

    /// Looks up a stable id previously recorded with [`ControlChannel::add_ids`].
    fn steam_id_for(&self, eos_id: &EosId) -> Option<SteamId>;

    async fn warn(&self, target: &str, message: &str) -> Result<(), ControlError>;

    async fn kick(&self, target: &str, reason: &str) -> Result<(), ControlError>;

    async fn ban(&self, target: &str, interval: &str, reason: &str) -> Result<(), ControlError>;

    /// Subscribes to the channel's framed event stream.
    fn subscribe(&self) -> broadcast::Receiver<ControlEvent>;
}

/// Source of decoded server log lines.
#[async_trait]
pub trait LogReader: Send + Sync {
    /// Starts tailing and returns the stream of lines. The stream ends when
    /// the reader is unwatched.
    async fn watch(&self) -> Result<mpsc::Receiver<String>, LogReaderError>;

    async fn unwatch(&self) -> Result<(), LogReaderError>;
}

/// Remote reference catalog of layers.
#[async_trait]
pub trait LayerSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Layer>, CatalogError>;
}

/// Admin lists in the server's `Admins.cfg` format.
#[async_trait]
pub trait AdminSource: Send + Sync {
    /// Returns the text of every configured list.
    async fn fetch(&self) -> Result<Vec<String>, AdminListError>;
}
