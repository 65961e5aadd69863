//! Transient state shared by the log rules.
//!
//! Nothing in here survives a restart. Every slot is scoped to the current
//! connection of the log stream and only exists so a rule can stitch its line
//! to lines that came before it.

use squad_event_system::SteamId;
use std::collections::HashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Join request waiting for its login confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConnection {
    pub suffix: String,
    inserted_at: Instant,
}

/// Join requests keyed by chain id.
///
/// Each entry is consumed at most once. Entries whose confirmation never
/// arrives expire after the TTL, and the oldest entry is evicted when the
/// table is full.
#[derive(Debug)]
pub struct PendingConnections {
    entries: HashMap<u64, PendingConnection>,
    ttl: Duration,
    capacity: usize,
}

impl PendingConnections {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Records a join request. A second request under the same chain id
    /// replaces the first.
    pub fn insert(&mut self, chain_id: u64, suffix: String, now: Instant) {
        self.expire(now);
        if !self.entries.contains_key(&chain_id) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(chain, _)| *chain);
            if let Some(oldest) = oldest {
                debug!("🧹 Evicting pending connection {} at capacity", oldest);
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            chain_id,
            PendingConnection {
                suffix,
                inserted_at: now,
            },
        );
    }

    /// Removes and returns the request for `chain_id`.
    pub fn take(&mut self, chain_id: u64, now: Instant) -> Option<PendingConnection> {
        self.expire(now);
        self.entries.remove(&chain_id)
    }

    /// Drops every entry older than the TTL and returns how many went.
    pub fn expire(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity of a player as observed through the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogIdentity {
    pub suffix: Option<String>,
    pub controller: Option<String>,
}

/// The last explosion trace, compared against the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplosionTrace {
    /// Log timestamp truncated to the second.
    pub second: String,
    pub chain_id: u64,
    pub instigator: String,
}

impl ExplosionTrace {
    pub fn same_burst(&self, other: &ExplosionTrace) -> bool {
        self.second == other.second && self.chain_id == other.chain_id && self.instigator == other.instigator
    }
}

/// One side of a finished match as announced in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamOutcome {
    pub team: u8,
    pub subfaction: String,
    pub faction: String,
    pub tickets: u32,
    pub layer: String,
    pub level: String,
}

/// All correlation state for one log stream.
#[derive(Debug)]
pub struct CorrelationStore {
    /// Controller name to the chain id of its latest possess.
    possess_chains: HashMap<String, u64>,
    last_move_chain: Option<u64>,
    last_explosion: Option<ExplosionTrace>,
    pending: PendingConnections,
    players: HashMap<SteamId, LogIdentity>,
    round_winner: Option<TeamOutcome>,
    round_loser: Option<TeamOutcome>,
}

impl CorrelationStore {
    pub fn new(pending_ttl: Duration, pending_capacity: usize) -> Self {
        Self {
            possess_chains: HashMap::new(),
            last_move_chain: None,
            last_explosion: None,
            pending: PendingConnections::new(pending_ttl, pending_capacity),
            players: HashMap::new(),
            round_winner: None,
            round_loser: None,
        }
    }

    /// Stores `chain_id` as the latest movement-warning chain. Returns false
    /// when it equals the stored one, i.e. the line continues the same burst.
    pub fn observe_move_chain(&mut self, chain_id: u64) -> bool {
        let changed = self.last_move_chain != Some(chain_id);
        self.last_move_chain = Some(chain_id);
        changed
    }

    /// Compares `trace` against the previous explosion trace, then stores it
    /// unconditionally. Returns true when every key matched.
    pub fn observe_explosion(&mut self, trace: ExplosionTrace) -> bool {
        let matched = self
            .last_explosion
            .as_ref()
            .is_some_and(|last| last.same_burst(&trace));
        self.last_explosion = Some(trace);
        matched
    }

    pub fn last_explosion(&self) -> Option<&ExplosionTrace> {
        self.last_explosion.as_ref()
    }

    pub fn record_possess(&mut self, controller: &str, chain_id: u64) {
        self.possess_chains.insert(controller.to_string(), chain_id);
    }

    pub fn possess_chain(&self, controller: &str) -> Option<u64> {
        self.possess_chains.get(controller).copied()
    }

    pub fn pending(&mut self) -> &mut PendingConnections {
        &mut self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Merges the log-side identity of `steam_id`, keeping fields not supplied.
    pub fn record_player(&mut self, steam_id: SteamId, suffix: Option<String>, controller: Option<String>) {
        let entry = self.players.entry(steam_id).or_default();
        if suffix.is_some() {
            entry.suffix = suffix;
        }
        if controller.is_some() {
            entry.controller = controller;
        }
    }

    pub fn player(&self, steam_id: SteamId) -> Option<&LogIdentity> {
        self.players.get(&steam_id)
    }

    pub fn set_round_outcome(&mut self, outcome: TeamOutcome, won: bool) {
        if won {
            self.round_winner = Some(outcome);
        } else {
            self.round_loser = Some(outcome);
        }
    }

    /// Takes both round outcomes; they are consumed exactly once.
    pub fn take_round_outcome(&mut self) -> (Option<TeamOutcome>, Option<TeamOutcome>) {
        (self.round_winner.take(), self.round_loser.take())
    }

    /// Forgets match-scoped state when a new map loads.
    pub fn reset_match(&mut self) {
        self.round_winner = None;
        self.round_loser = None;
        self.possess_chains.clear();
        self.last_move_chain = None;
        self.last_explosion = None;
    }
}
