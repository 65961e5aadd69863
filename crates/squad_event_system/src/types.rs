//! # Core Type Definitions
//!
//! The domain model shared by the engine and its plugins: players, squads,
//! layers and the server-information snapshot.
//!
//! ## Identity namespaces
//!
//! A player is known under several independent identifiers:
//!
//! - [`SteamId`] - the stable platform account id, canonical key of a [`Player`]
//! - [`EosId`] - transient id assigned at connect time
//! - display name and the log-observed name suffix
//! - the engine player-controller handle and the possessed pawn instance

use serde::{Deserialize, Serialize};

/// Stable platform account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SteamId(pub u64);

impl std::str::FromStr for SteamId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl std::fmt::Display for SteamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-scoped identifier assigned at connect time (32 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EosId(pub String);

impl EosId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EosId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connected player.
///
/// At most one canonical `Player` exists per [`SteamId`]. Fields beyond the
/// ones reported by the roster poll are filled in as log lines resolve further
/// identity namespaces, and carried forward across roster refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub steam_id: SteamId,
    pub eos_id: Option<EosId>,
    pub name: String,
    /// Name as it appears in the server log; may differ from `name` when the
    /// player carries a clan tag.
    pub suffix: Option<String>,
    pub team_id: Option<u8>,
    pub squad_id: Option<u32>,
    #[serde(default)]
    pub is_leader: bool,
    pub role: Option<String>,
    /// Engine player-controller actor, e.g. `BP_PlayerController_C_2130438728`.
    pub player_controller: Option<String>,
    /// Class of the possessed pawn, e.g. `BP_Soldier_RU_Medic`.
    pub possess_classname: Option<String>,
    /// Instance name of the possessed pawn, e.g. `BP_Soldier_RU_Medic_C_2130401015`.
    /// Cleared on unpossess.
    pub character_classname: Option<String>,
    pub squad: Option<Squad>,
}

impl Player {
    /// A minimal record used when identity resolution fails but downstream
    /// consumers still need something to hold on to.
    pub fn minimal(steam_id: SteamId, eos_id: Option<EosId>, name: impl Into<String>) -> Self {
        Self {
            steam_id,
            eos_id,
            name: name.into(),
            suffix: None,
            team_id: None,
            squad_id: None,
            is_leader: false,
            role: None,
            player_controller: None,
            possess_classname: None,
            character_classname: None,
            squad: None,
        }
    }

    /// True when both refer to different people on the same team.
    pub fn is_teammate_of(&self, other: &Player) -> bool {
        self.team_id.is_some() && self.team_id == other.team_id && self.steam_id != other.steam_id
    }
}

/// A squad, keyed by `(team_id, squad_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub team_id: u8,
    pub squad_id: u32,
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub locked: bool,
    pub creator_name: Option<String>,
    pub creator_steam_id: Option<SteamId>,
    pub team_name: Option<String>,
}

/// One side of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub faction: String,
    pub name: String,
    #[serde(default)]
    pub tickets: u32,
    #[serde(default)]
    pub commander: bool,
    #[serde(default)]
    pub vehicles: Vec<String>,
    #[serde(default)]
    pub number_of_tanks: u32,
    #[serde(default)]
    pub number_of_helicopters: u32,
}

impl TeamInfo {
    pub fn unknown() -> Self {
        Self::named("Unknown")
    }

    pub fn named(faction: &str) -> Self {
        Self {
            faction: faction.to_string(),
            name: faction.to_string(),
            tickets: 0,
            commander: false,
            vehicles: Vec::new(),
            number_of_tanks: 0,
            number_of_helicopters: 0,
        }
    }
}

/// A playable map + mode + faction configuration.
///
/// Layers are immutable once built: the catalog replaces whole entries, it
/// never patches fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub layer_id: String,
    pub name: String,
    pub classname: String,
    pub map_name: String,
    #[serde(default = "default_mod_name")]
    pub mod_name: String,
    pub gamemode: String,
    #[serde(default)]
    pub gamemode_type: Option<String>,
    pub version: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub size_type: Option<String>,
    #[serde(default)]
    pub number_of_capture_points: u32,
    #[serde(default)]
    pub lighting: Option<String>,
    #[serde(default)]
    pub teams: Vec<TeamInfo>,
}

fn default_mod_name() -> String {
    "Vanilla".to_string()
}

/// A layer the server played, most recent first in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerHistoryEntry {
    pub layer: Option<Layer>,
    pub time: chrono::DateTime<chrono::Utc>,
}

/// Parsed response of the server-information query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_name: String,
    pub max_players: u32,
    pub public_queue_limit: u32,
    pub reserve_slots: u32,
    pub public_slots: u32,
    pub player_count: u32,
    pub public_queue: u32,
    pub reserve_queue: u32,
    pub current_layer: String,
    pub next_layer: String,
    pub team_one: String,
    pub team_two: String,
    pub match_timeout: f64,
    pub game_version: String,
    pub raw: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(steam: u64, team: Option<u8>) -> Player {
        let mut p = Player::minimal(SteamId(steam), None, format!("p{steam}"));
        p.team_id = team;
        p
    }

    #[test]
    fn teammate_requires_same_team_and_distinct_person() {
        assert!(player(1, Some(1)).is_teammate_of(&player(2, Some(1))));
        assert!(!player(1, Some(1)).is_teammate_of(&player(1, Some(1))));
        assert!(!player(1, Some(1)).is_teammate_of(&player(2, Some(2))));
        assert!(!player(1, None).is_teammate_of(&player(2, None)));
    }

    #[test]
    fn steam_id_parses_with_whitespace() {
        assert_eq!(" 76561198000000001".parse::<SteamId>().unwrap(), SteamId(76561198000000001));
        assert!("not-a-number".parse::<SteamId>().is_err());
    }

    #[test]
    fn catalog_layer_defaults_fill_missing_fields() {
        let layer: Layer = serde_json::from_value(serde_json::json!({
            "layer_id": "Narva_RAAS_v1",
            "name": "Narva RAAS v1",
            "classname": "Narva",
            "map_name": "Narva",
            "gamemode": "RAAS",
            "version": "v1"
        }))
        .unwrap();
        assert_eq!(layer.mod_name, "Vanilla");
        assert!(layer.teams.is_empty());
    }
}
