//! Damage, wound, death and revive lines.

use super::{header, number, text};
use crate::error::LogRuleError;
use crate::log_parser::{CorrelationStore, DamageLine, LogEvent};
use regex::Captures;
use squad_event_system::EosId;
use tokio::time::Instant;

pub(super) const PLAYER_DAMAGED: &str = log_line!(
    r"LogSquad: Player:(.+) ActualDamage=([0-9.]+) from (.+) \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d{17}) \| Player Controller ID: ([^ ]+)\)caused by ([A-z_0-9-]+)_C"
);

pub(super) const PLAYER_WOUNDED: &str = log_line!(
    r"LogSquadTrace: \[DedicatedServer\](?:ASQSoldier::)?Wound\(\): Player:(.+) KillingDamage=(?:-)*([0-9.]+) from ([A-z_0-9]+) \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d{17}) \| Contoller ID: ([\w\d]+)\) caused by ([A-z_0-9-]+)_C"
);

pub(super) const PLAYER_DIED: &str = log_line!(
    r"LogSquadTrace: \[DedicatedServer\](?:ASQSoldier::)?Die\(\): Player:(.+) KillingDamage=(?:-)*([0-9.]+) from ([A-z_0-9]+) \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d{17}) \| Contoller ID: ([\w\d]+)\) caused by ([A-z_0-9-]+)_C"
);

pub(super) const PLAYER_REVIVED: &str = log_line!(
    r"LogSquad: (.+) \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d{17})\) has revived (.+) \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d{17})\)\."
);

/// The damage line names the attacker and its controller id separately.
pub(super) fn player_damaged(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::PlayerDamaged(DamageLine {
        header: header(caps)?,
        victim_name: text(caps, 3).to_string(),
        damage: number(caps, 4, "damage")?,
        attacker_name: Some(text(caps, 5).to_string()),
        attacker_eos_id: EosId::new(text(caps, 6)),
        attacker_steam_id: number(caps, 7, "attacker_steam_id")?,
        attacker_controller: Some(text(caps, 8).to_string()),
        weapon: text(caps, 9).to_string(),
    })))
}

/// Wound and death lines name the attacker by its player controller.
fn trace_damage(caps: &Captures<'_>) -> Result<DamageLine, LogRuleError> {
    Ok(DamageLine {
        header: header(caps)?,
        victim_name: text(caps, 3).to_string(),
        damage: number(caps, 4, "damage")?,
        attacker_name: None,
        attacker_eos_id: EosId::new(text(caps, 6)),
        attacker_steam_id: number(caps, 7, "attacker_steam_id")?,
        attacker_controller: Some(text(caps, 5).to_string()),
        weapon: text(caps, 9).to_string(),
    })
}

pub(super) fn player_wounded(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::PlayerWounded(trace_damage(caps)?)))
}

pub(super) fn player_died(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::PlayerDied(trace_damage(caps)?)))
}

pub(super) fn player_revived(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::PlayerRevived {
        header: header(caps)?,
        reviver_name: text(caps, 3).to_string(),
        reviver_eos_id: EosId::new(text(caps, 4)),
        victim_name: text(caps, 6).to_string(),
        victim_eos_id: EosId::new(text(caps, 7)),
    }))
}
