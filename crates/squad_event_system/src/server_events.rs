//! Payloads published on the `server:*` and `command:*` topics.
//!
//! Log-derived payloads keep the raw line and the log timestamp string as
//! they appeared in the log. Control-channel payloads carry a UTC timestamp.
//! Resolved players are `Option`s: an absent or ambiguous identity is a
//! normal outcome that subscribers are expected to handle.

use crate::types::{EosId, Layer, Player, ServerInfo, SteamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic names published by the engine under the `server:` namespace.
pub mod names {
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const POSSESSED_ADMIN_CAMERA: &str = "possessed_admin_camera";
    pub const UNPOSSESSED_ADMIN_CAMERA: &str = "unpossessed_admin_camera";
    pub const PLAYER_WARNED: &str = "player_warned";
    pub const PLAYER_KICKED: &str = "player_kicked";
    pub const PLAYER_BANNED: &str = "player_banned";
    pub const SQUAD_CREATED: &str = "squad_created";
    pub const RCON_ERROR: &str = "rcon_error";

    pub const ADMIN_BROADCAST: &str = "admin_broadcast";
    pub const DEPLOYABLE_DAMAGED: &str = "deployable_damaged";
    pub const NEW_GAME: &str = "new_game";
    pub const ROUND_ENDED: &str = "round_ended";
    pub const PLAYER_CONNECTED: &str = "player_connected";
    pub const PLAYER_DISCONNECTED: &str = "player_disconnected";
    pub const PLAYER_DAMAGED: &str = "player_damaged";
    pub const PLAYER_WOUNDED: &str = "player_wounded";
    pub const TEAMKILL: &str = "teamkill";
    pub const PLAYER_DIED: &str = "player_died";
    pub const PLAYER_REVIVED: &str = "player_revived";
    pub const PLAYER_POSSESS: &str = "player_possess";
    pub const PLAYER_UNPOSSESS: &str = "player_unpossess";
    pub const PLAYER_CHEAT: &str = "player_cheat";
    pub const TICK_RATE: &str = "tick_rate";

    pub const UPDATED_PLAYER_INFORMATION: &str = "updated_player_information";
    pub const UPDATED_SQUAD_INFORMATION: &str = "updated_squad_information";
    pub const UPDATED_LAYER_INFORMATION: &str = "updated_layer_information";
    pub const UPDATED_SERVER_INFORMATION: &str = "updated_server_information";
    pub const PLAYER_NAME_CHANGE: &str = "player_name_change";
    pub const PLAYER_TEAM_CHANGE: &str = "player_team_change";
    pub const PLAYER_SQUAD_CHANGE: &str = "player_squad_change";
}

// ---------------------------------------------------------------------------
// Control-channel originated
// ---------------------------------------------------------------------------

/// A chat line. Also published on `command:<word>` with `message` stripped of
/// the command prefix and word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    pub chat: String,
    pub name: String,
    pub steam_id: SteamId,
    pub eos_id: Option<EosId>,
    pub message: String,
    pub time: DateTime<Utc>,
    pub command: Option<String>,
    pub player: Option<Player>,
}

/// Entering or leaving the admin camera. `duration_ms` is only set on exit and
/// is zero when the matching entry was never observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCameraEvent {
    pub name: String,
    pub steam_id: SteamId,
    pub time: DateTime<Utc>,
    pub duration_ms: Option<i64>,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerWarnedEvent {
    pub name: String,
    pub reason: String,
    pub time: DateTime<Utc>,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerKickedEvent {
    pub player_id: String,
    pub steam_id: SteamId,
    pub name: String,
    pub time: DateTime<Utc>,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBannedEvent {
    pub player_id: String,
    pub steam_id: SteamId,
    pub name: String,
    pub interval: String,
    pub time: DateTime<Utc>,
    pub player: Option<Player>,
}

/// A squad was created. The creator is re-resolved and carries the new squad id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadCreatedEvent {
    pub squad_id: u32,
    pub squad_name: String,
    pub team_name: String,
    pub time: DateTime<Utc>,
    pub player: Option<Player>,
}

/// A transport-level fault reported by the control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RconErrorEvent {
    pub message: String,
    pub time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Log originated
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBroadcastEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub message: String,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployableDamagedEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub deployable: String,
    pub damage: f64,
    pub weapon: String,
    pub damage_type: String,
    pub health_remaining: f64,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGameEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub dlc: String,
    pub map_classname: String,
    pub layer_classname: String,
    pub layer: Option<Layer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundEndedEvent {
    pub raw: String,
    pub time: String,
    pub winner_id: Option<u8>,
    pub winner_faction: Option<String>,
    pub winner_tickets: Option<u32>,
    pub loser_id: Option<u8>,
    pub loser_faction: Option<String>,
    pub loser_tickets: Option<u32>,
    pub raw_layer: Option<String>,
    pub raw_level: Option<String>,
    pub layer: Option<Layer>,
}

/// A player finished logging in. `player` is always present: the roster entry
/// when one matches, otherwise a minimal record built from the log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConnectedEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub ip: String,
    pub player_controller: Option<String>,
    pub player: Player,
}

/// A player left. `player` falls back to the last roster entry seen for the
/// transient id, then to a record built from the control channel's id index;
/// it is `None` only when neither knows the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDisconnectedEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub ip: String,
    pub eos_id: EosId,
    pub player_controller: String,
    pub player: Option<Player>,
}

/// Damage, wound, death and teamkill all share this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDamageEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub victim_name: String,
    pub damage: f64,
    /// Only the damage line names the attacker; wound and death lines carry
    /// the attacker's controller instead.
    pub attacker_name: Option<String>,
    pub attacker_eos_id: Option<EosId>,
    pub attacker_steam_id: Option<SteamId>,
    pub attacker_controller: Option<String>,
    pub weapon: String,
    pub victim: Option<Player>,
    pub attacker: Option<Player>,
    /// Same team, different person. False when either side is unresolved.
    pub teamkill: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRevivedEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub reviver_name: String,
    pub victim_name: String,
    pub reviver: Option<Player>,
    pub victim: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPossessEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub player_suffix: String,
    pub possess_classname: String,
    pub character_classname: String,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerUnpossessEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub player_suffix: String,
    /// The unpossess happened in the same chain as the last possess by this
    /// controller, i.e. the player switched bodies rather than left one.
    pub switch_possess: bool,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRateEvent {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
    pub tick_rate: f64,
}

/// Suspected cheating with the evidence that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCheatEvent {
    pub raw: String,
    pub time: String,
    pub raw_id: String,
    pub cheat_type: String,
    /// `Some("unlikely")` when the evidence is weak, `None` means high.
    pub probability: Option<String>,
    pub probability_color: Option<u32>,
    pub player: Option<Player>,
}

// ---------------------------------------------------------------------------
// Reconciliation loops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerListUpdatedEvent {
    pub version: u64,
    pub player_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadListUpdatedEvent {
    pub version: u64,
    pub squad_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerInformationUpdatedEvent {
    pub current_layer: Option<Layer>,
    pub next_layer: Option<Layer>,
    pub next_layer_to_be_voted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInformationUpdatedEvent {
    pub info: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerNameChangeEvent {
    pub player: Player,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerTeamChangeEvent {
    pub player: Player,
    pub old_team_id: Option<u8>,
    pub new_team_id: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSquadChangeEvent {
    pub player: Player,
    pub old_squad_id: Option<u32>,
    pub new_squad_id: Option<u32>,
}
