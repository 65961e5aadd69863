//! Decomposition of layer identifiers into their parts.
//!
//! An identifier is sanitized to `[0-9A-Za-z_-]` and split on `_`. Tokens are
//! then classified from both ends:
//!
//! 1. a trailing `CQB` token is dropped
//! 2. a trailing `A-B` token (both sides alphanumeric, not a version) names the teams
//! 3. a trailing version token (`v1`, `V12`, `v2-A`, `D`, `N`) is the version
//! 4. a trailing known gamemode is the gamemode, if a token remains before it
//! 5. a leading all-caps token of two or more letters is the gamemode when it
//!    is a known gamemode and none was found yet, otherwise the mod
//! 6. whatever remains must be letters only and is the level, joined by `_`
//!
//! `RAAS_Narva_v1_USA-RUS` is level `Narva`, gamemode `RAAS`, version `v1`,
//! teams `USA`/`RUS`. `Narva_RAAS_v1` and `GE_Al_Basrah_Invasion_v2` work the
//! same way from the other side. Identifiers with an empty token, a numeric
//! level token, or nothing left for the level do not parse.

use squad_event_system::{Layer, TeamInfo};

const KNOWN_GAMEMODES: &[&str] = &[
    "AAS",
    "RAAS",
    "Invasion",
    "Insurgency",
    "Skirmish",
    "TC",
    "Destruction",
    "Seed",
    "Training",
    "Tanks",
    "FRAAS",
    "Track",
    "Conquest",
    "Gungame",
];

pub const DEFAULT_MOD: &str = "Vanilla";
pub const DEFAULT_GAMEMODE: &str = "Training";
pub const DEFAULT_VERSION: &str = "v0";
pub const DEFAULT_FACTION: &str = "Unknown";

/// Parts of a layer identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerName {
    pub layer_id: String,
    pub mod_name: Option<String>,
    pub level: String,
    pub gamemode: Option<String>,
    pub version: Option<String>,
    pub teams: Option<(String, String)>,
}

fn is_known_gamemode(token: &str) -> bool {
    KNOWN_GAMEMODES.iter().any(|g| g.eq_ignore_ascii_case(token))
}

fn is_version(token: &str) -> bool {
    if token == "D" || token == "N" {
        return true;
    }
    let Some(rest) = token.strip_prefix(['v', 'V']) else {
        return false;
    };
    let (number, variant) = match rest.split_once('-') {
        Some((number, variant)) => (number, Some(variant)),
        None => (rest, None),
    };
    let number_ok = !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit());
    let variant_ok = variant.map_or(true, |v| v.len() == 1 && v.bytes().all(|b| b.is_ascii_alphanumeric()));
    number_ok && variant_ok
}

fn split_teams(token: &str) -> Option<(String, String)> {
    if is_version(token) {
        return None;
    }
    let (a, b) = token.split_once('-')?;
    let alnum = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_alphanumeric());
    (alnum(a) && alnum(b)).then(|| (a.to_string(), b.to_string()))
}

fn is_all_caps(token: &str) -> bool {
    token.len() >= 2 && token.bytes().all(|b| b.is_ascii_uppercase())
}

/// Strips everything outside `[0-9A-Za-z_-]`.
pub fn sanitize(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Parses a layer identifier, or `None` when it does not follow the grammar.
pub fn parse_layer_name(id: &str) -> Option<LayerName> {
    let layer_id = sanitize(id);
    if layer_id.is_empty() {
        return None;
    }
    let mut tokens: Vec<&str> = layer_id.split('_').collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return None;
    }

    if tokens.len() > 1 && tokens.last() == Some(&"CQB") {
        tokens.pop();
    }

    let mut teams = None;
    if tokens.len() > 1 {
        if let Some(pair) = tokens.last().and_then(|t| split_teams(t)) {
            teams = Some(pair);
            tokens.pop();
        }
    }

    let mut version = None;
    if tokens.len() > 1 && tokens.last().is_some_and(|t| is_version(t)) {
        version = tokens.pop().map(str::to_string);
    }

    let mut gamemode = None;
    if tokens.len() > 1 && tokens.last().is_some_and(|t| is_known_gamemode(t)) {
        gamemode = tokens.pop().map(str::to_string);
    }

    let mut mod_name = None;
    if tokens.len() > 1 && is_all_caps(tokens[0]) {
        let leading = tokens.remove(0).to_string();
        if gamemode.is_none() && is_known_gamemode(&leading) {
            gamemode = Some(leading);
        } else {
            mod_name = Some(leading);
        }
    }

    if tokens.is_empty() || !tokens.iter().all(|t| t.bytes().all(|b| b.is_ascii_alphabetic())) {
        return None;
    }

    Some(LayerName {
        level: tokens.join("_"),
        layer_id,
        mod_name,
        gamemode,
        version,
        teams,
    })
}

/// Builds a catalog entry for an identifier the catalog does not know.
pub fn synthesize_layer(id: &str) -> Option<Layer> {
    let parsed = parse_layer_name(id)?;
    let gamemode = parsed.gamemode.unwrap_or_else(|| DEFAULT_GAMEMODE.to_string());
    let (team_one, team_two) = parsed
        .teams
        .unwrap_or_else(|| (DEFAULT_FACTION.to_string(), DEFAULT_FACTION.to_string()));

    Some(Layer {
        name: parsed.layer_id.replace('_', " "),
        classname: parsed.level.clone(),
        map_name: parsed.level,
        layer_id: parsed.layer_id,
        mod_name: parsed.mod_name.unwrap_or_else(|| DEFAULT_MOD.to_string()),
        gamemode_type: Some(gamemode.clone()),
        gamemode,
        version: parsed.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        size: Some("0.0x0.0 km".to_string()),
        size_type: Some("Playable Area".to_string()),
        number_of_capture_points: 0,
        lighting: Some("Unknown".to_string()),
        teams: vec![TeamInfo::named(&team_one), TeamInfo::named(&team_two)],
    })
}
