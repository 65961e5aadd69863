//! Extraction of domain events from server log lines.
//!
//! Every line is tried against a fixed table of rules in order and the first
//! rule whose pattern matches owns the line. A rule may read and write the
//! [`CorrelationStore`] and yields zero or one [`LogEvent`].

mod rules;
pub mod store;

pub use store::{CorrelationStore, ExplosionTrace, LogIdentity, PendingConnections, TeamOutcome};

use crate::config::EngineConfig;
use crate::error::LogRuleError;
use squad_event_system::{EosId, SteamId};
use tokio::time::Instant;
use tracing::{trace, warn};

/// Fields every log line starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct LineHeader {
    pub raw: String,
    pub time: String,
    pub chain_id: u64,
}

/// Shared shape of the damage, wound and death lines.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageLine {
    pub header: LineHeader,
    pub victim_name: String,
    pub damage: f64,
    pub attacker_name: Option<String>,
    pub attacker_eos_id: EosId,
    pub attacker_steam_id: SteamId,
    pub attacker_controller: Option<String>,
    pub weapon: String,
}

/// Anomaly strength of a movement warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheatProbability {
    High,
    Unlikely,
}

/// A domain event extracted from the log, before identity enrichment.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    AdminBroadcast {
        header: LineHeader,
        message: String,
        from: String,
    },
    DeployableDamaged {
        header: LineHeader,
        deployable: String,
        damage: f64,
        weapon: String,
        player_suffix: String,
        damage_type: String,
        health_remaining: f64,
    },
    NewGame {
        header: LineHeader,
        dlc: String,
        map_classname: String,
        layer_classname: String,
    },
    RoundEnded {
        header: LineHeader,
        winner: Option<TeamOutcome>,
        loser: Option<TeamOutcome>,
    },
    PlayerConnected {
        header: LineHeader,
        ip: String,
        eos_id: EosId,
        steam_id: SteamId,
        player_suffix: String,
        player_controller: Option<String>,
    },
    PlayerDisconnected {
        header: LineHeader,
        ip: String,
        player_controller: String,
        eos_id: EosId,
    },
    PlayerDamaged(DamageLine),
    PlayerWounded(DamageLine),
    PlayerDied(DamageLine),
    PlayerRevived {
        header: LineHeader,
        reviver_name: String,
        reviver_eos_id: EosId,
        victim_name: String,
        victim_eos_id: EosId,
    },
    PlayerPossess {
        header: LineHeader,
        player_suffix: String,
        eos_id: Option<EosId>,
        possess_classname: String,
        character_classname: String,
    },
    PlayerUnpossess {
        header: LineHeader,
        player_suffix: String,
        eos_id: Option<EosId>,
        switch_possess: bool,
    },
    TickRate {
        header: LineHeader,
        tick_rate: f64,
    },
    /// Movement timestamps out of the plausible window for a pawn.
    MovementAnomaly {
        header: LineHeader,
        character_name: String,
        probability: CheatProbability,
    },
    /// Two identical instigator-only explosion traces back to back.
    ExplosionAttack {
        header: LineHeader,
        instigator: String,
    },
    ExternalAccountInfo {
        header: LineHeader,
        eos_id: EosId,
        steam_id: SteamId,
    },
}

impl LogEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::AdminBroadcast { .. } => "admin_broadcast",
            LogEvent::DeployableDamaged { .. } => "deployable_damaged",
            LogEvent::NewGame { .. } => "new_game",
            LogEvent::RoundEnded { .. } => "round_ended",
            LogEvent::PlayerConnected { .. } => "player_connected",
            LogEvent::PlayerDisconnected { .. } => "player_disconnected",
            LogEvent::PlayerDamaged(_) => "player_damaged",
            LogEvent::PlayerWounded(_) => "player_wounded",
            LogEvent::PlayerDied(_) => "player_died",
            LogEvent::PlayerRevived { .. } => "player_revived",
            LogEvent::PlayerPossess { .. } => "player_possess",
            LogEvent::PlayerUnpossess { .. } => "player_unpossess",
            LogEvent::TickRate { .. } => "tick_rate",
            LogEvent::MovementAnomaly { .. } => "movement_anomaly",
            LogEvent::ExplosionAttack { .. } => "explosion_attack",
            LogEvent::ExternalAccountInfo { .. } => "external_account_info",
        }
    }
}

/// Applies the rule table to log lines, owning the correlation state.
#[derive(Debug)]
pub struct LogEventExtractor {
    store: CorrelationStore,
    lines_seen: u64,
    lines_matched: u64,
}

impl LogEventExtractor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            store: CorrelationStore::new(config.pending_connection_ttl(), config.pending_connection_capacity),
            lines_seen: 0,
            lines_matched: 0,
        }
    }

    /// Extracts at most one event from `line`. Rule failures are logged and
    /// produce nothing.
    pub fn extract(&mut self, line: &str) -> Option<LogEvent> {
        self.extract_at(line, Instant::now())
    }

    pub fn extract_at(&mut self, line: &str, now: Instant) -> Option<LogEvent> {
        match self.try_extract(line, now) {
            Ok(event) => event,
            Err(e) => {
                warn!("⚠️ Log rule could not correlate line: {}", e);
                None
            }
        }
    }

    /// Like [`LogEventExtractor::extract_at`] but surfaces rule failures.
    pub fn try_extract(&mut self, line: &str, now: Instant) -> Result<Option<LogEvent>, LogRuleError> {
        self.lines_seen += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        for rule in rules::RULES.iter() {
            let Some(caps) = rule.pattern.captures(line) else {
                continue;
            };
            self.lines_matched += 1;
            trace!("📜 Line matched rule {}", rule.name);
            return (rule.handler)(&caps, &mut self.store, now);
        }
        Ok(None)
    }

    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// `(lines seen, lines matched by some rule)`
    pub fn stats(&self) -> (u64, u64) {
        (self.lines_seen, self.lines_matched)
    }
}

#[cfg(test)]
mod tests;
