//! Match lifecycle and server-wide lines.

use super::{header, number, text};
use crate::error::LogRuleError;
use crate::log_parser::{CorrelationStore, LogEvent, TeamOutcome};
use regex::Captures;
use tokio::time::Instant;

pub(super) const ADMIN_BROADCAST: &str = log_line!(r"LogSquad: ADMIN COMMAND: Message broadcasted <(.+)> from (.+)");

pub(super) const DEPLOYABLE_DAMAGED: &str = log_line!(
    r"LogSquadTrace: \[DedicatedServer\](?:ASQDeployable::)?TakeDamage\(\): ([A-z0-9_]+)_C_[0-9]+: ([0-9.]+) damage attempt by causer ([A-z0-9_]+)_C_[0-9]+ instigator (.+) with damage type ([A-z0-9_]+)_C health remaining ([0-9.]+)"
);

pub(super) const NEW_GAME: &str = log_line!(
    r"LogWorld: Bringing World /([A-z]+)/(?:Maps/)?([A-z0-9-]+)/(?:.+/)?([A-z0-9-]+)(?:\.[A-z0-9-]+)"
);

pub(super) const ROUND_TEAM_OUTCOME: &str = log_line!(
    r"LogSquadGameEvents: Display: Team ([0-9]), (.*) \( ?(.*?) ?\) has (won|lost) the match with ([0-9]+) Tickets on layer (.*) \(level (.*)\)!"
);

pub(super) const ROUND_ENDED: &str = log_line!(r"LogGameState: Match State Changed from InProgress to WaitingPostMatch");

pub(super) const TICK_RATE: &str = log_line!(r"LogSquad: USQGameState: Server Tick Rate: ([0-9.]+)");

const TRANSITION_MAP: &str = "TransitionMap";

pub(super) fn admin_broadcast(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::AdminBroadcast {
        header: header(caps)?,
        message: text(caps, 3).to_string(),
        from: text(caps, 4).to_string(),
    }))
}

pub(super) fn deployable_damaged(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::DeployableDamaged {
        header: header(caps)?,
        deployable: text(caps, 3).to_string(),
        damage: number(caps, 4, "damage")?,
        weapon: text(caps, 5).to_string(),
        player_suffix: text(caps, 6).to_string(),
        damage_type: text(caps, 7).to_string(),
        health_remaining: number(caps, 8, "health_remaining")?,
    }))
}

/// The transition map loads between every two layers and is not a game.
pub(super) fn new_game(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let layer_classname = text(caps, 5);
    if layer_classname == TRANSITION_MAP {
        return Ok(None);
    }
    store.reset_match();
    Ok(Some(LogEvent::NewGame {
        header: header(caps)?,
        dlc: text(caps, 3).to_string(),
        map_classname: text(caps, 4).to_string(),
        layer_classname: layer_classname.to_string(),
    }))
}

pub(super) fn round_team_outcome(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let outcome = TeamOutcome {
        team: number(caps, 3, "team")?,
        subfaction: text(caps, 4).to_string(),
        faction: text(caps, 5).to_string(),
        tickets: number(caps, 7, "tickets")?,
        layer: text(caps, 8).to_string(),
        level: text(caps, 9).to_string(),
    };
    store.set_round_outcome(outcome, text(caps, 6) == "won");
    Ok(None)
}

/// Consumes whatever outcomes were announced since the last round end.
pub(super) fn round_ended(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let (winner, loser) = store.take_round_outcome();
    Ok(Some(LogEvent::RoundEnded {
        header: header(caps)?,
        winner,
        loser,
    }))
}

pub(super) fn tick_rate(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::TickRate {
        header: header(caps)?,
        tick_rate: number(caps, 3, "tick_rate")?,
    }))
}
