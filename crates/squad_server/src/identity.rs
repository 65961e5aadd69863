//! Player identity resolution.
//!
//! A lookup filters the current roster with a single equality predicate and
//! succeeds only when exactly one player matches. Zero or several matches both
//! resolve to `None`; an ambiguous reference is never narrowed down by guessing.

use crate::error::ServerError;
use crate::state::ServerState;
use async_trait::async_trait;
use squad_event_system::{EosId, Player, Squad, SteamId};
use std::sync::Arc;
use tracing::{debug, warn};

/// The namespace a player reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey<'a> {
    SteamId(SteamId),
    EosId(&'a EosId),
    Name(&'a str),
    Suffix(&'a str),
    Controller(&'a str),
    /// Instance name of the possessed pawn.
    Classname(&'a str),
}

impl PlayerKey<'_> {
    pub fn matches(&self, player: &Player) -> bool {
        match *self {
            PlayerKey::SteamId(id) => player.steam_id == id,
            PlayerKey::EosId(id) => player.eos_id.as_ref() == Some(id),
            PlayerKey::Name(name) => player.name == name,
            PlayerKey::Suffix(suffix) => player.suffix.as_deref() == Some(suffix),
            PlayerKey::Controller(controller) => player.player_controller.as_deref() == Some(controller),
            PlayerKey::Classname(classname) => player.character_classname.as_deref() == Some(classname),
        }
    }
}

/// Returns the single player matching `key`, or `None`.
pub fn find_exactly_one<'p>(players: &'p [Player], key: PlayerKey<'_>) -> Option<&'p Player> {
    let mut matches = players.iter().filter(|p| key.matches(p));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

/// Returns the squad with exactly this composite key, or `None`.
pub fn find_squad(squads: &[Squad], team_id: Option<u8>, squad_id: Option<u32>) -> Option<&Squad> {
    let (team_id, squad_id) = (team_id?, squad_id?);
    let mut matches = squads
        .iter()
        .filter(|s| s.team_id == team_id && s.squad_id == squad_id);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

/// Something that can re-poll the roster on demand.
#[async_trait]
pub trait RosterRefresh: Send + Sync {
    async fn refresh_roster(&self) -> Result<(), ServerError>;
}

/// Whether a failed lookup may trigger a roster refresh and a second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Cached,
    Retry,
}

/// Resolves player references against the canonical roster.
pub struct IdentityResolver {
    state: Arc<ServerState>,
    refresher: std::sync::RwLock<Option<Arc<dyn RosterRefresh>>>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

impl IdentityResolver {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            refresher: std::sync::RwLock::new(None),
        }
    }

    /// Installs the refresher used by [`Lookup::Retry`].
    pub fn set_refresher(&self, refresher: Arc<dyn RosterRefresh>) {
        if let Ok(mut slot) = self.refresher.write() {
            *slot = Some(refresher);
        }
    }

    /// Resolves `key` against the current roster.
    pub async fn resolve(&self, key: PlayerKey<'_>, lookup: Lookup) -> Option<Player> {
        if let Some(player) = self.resolve_cached(key).await {
            return Some(player);
        }
        if lookup == Lookup::Cached {
            debug!("🔎 No unique player for {:?}", key);
            return None;
        }

        let refresher = self.refresher.read().ok().and_then(|slot| slot.clone());
        match refresher {
            Some(refresher) => {
                if let Err(e) = refresher.refresh_roster().await {
                    warn!("⚠️ Roster refresh for {:?} failed: {}", key, e);
                }
            }
            None => debug!("🔎 No roster refresher installed, retrying {:?} on cached roster", key),
        }
        self.resolve_cached(key).await
    }

    async fn resolve_cached(&self, key: PlayerKey<'_>) -> Option<Player> {
        let roster = self.state.players.load().await;
        find_exactly_one(&roster.value, key).cloned()
    }

    pub async fn by_steam_id(&self, steam_id: SteamId) -> Option<Player> {
        self.resolve(PlayerKey::SteamId(steam_id), Lookup::Cached).await
    }

    pub async fn by_eos_id(&self, eos_id: Option<&EosId>) -> Option<Player> {
        self.resolve(PlayerKey::EosId(eos_id?), Lookup::Cached).await
    }

    pub async fn by_name(&self, name: &str) -> Option<Player> {
        self.resolve(PlayerKey::Name(name), Lookup::Cached).await
    }

    pub async fn by_suffix(&self, suffix: &str) -> Option<Player> {
        self.resolve(PlayerKey::Suffix(suffix), Lookup::Cached).await
    }

    pub async fn by_controller(&self, controller: Option<&str>) -> Option<Player> {
        self.resolve(PlayerKey::Controller(controller?), Lookup::Cached).await
    }

    pub async fn by_classname(&self, classname: &str) -> Option<Player> {
        self.resolve(PlayerKey::Classname(classname), Lookup::Cached).await
    }

    pub async fn squad_by_id(&self, team_id: Option<u8>, squad_id: Option<u32>) -> Option<Squad> {
        let squads = self.state.squads.load().await;
        find_squad(&squads.value, team_id, squad_id).cloned()
    }
}
