//! Heuristics for suspicious client behaviour.

use super::{header, header_from, number, text};
use crate::error::LogRuleError;
use crate::log_parser::{CheatProbability, CorrelationStore, ExplosionTrace, LogEvent};
use regex::Captures;
use tokio::time::Instant;

pub(super) const BAD_PLAYER_MOVEMENT: &str = log_line!(
    r"LogNetPlayerMovement: Warning: ServerMove: TimeStamp expired: ([0-9.]+), CurrentTimeStamp: ([0-9.]+), Character: ([a-zA-Z0-9_]+)"
);

/// Own prefix: the timestamp is split so the second can be compared.
pub(super) const APPLY_EXPLOSIVE_DAMAGE: &str = r"^\[(([0-9.-]+):[0-9]+)\]\[([ 0-9]+)\]LogSquadTrace: \[DedicatedServer\]ApplyExplosiveDamage\(\): HitActor=nullptr DamageCauser=[A-z0-9_]+ DamageInstigator=([A-z0-9_]+)";

/// Upper bound of the small positive timestamp window.
const SMALL_DRIFT_MAX: f64 = 235.0;
/// Drift below this is a large negative jump.
const LARGE_NEGATIVE_DRIFT: f64 = -100.0;
/// A client clock this young carries little evidence.
const UNLIKELY_BELOW_TIMESTAMP: f64 = 2.0;

/// True when the expired timestamp drifted into either suspicious band.
pub(crate) fn suspicious_drift(expired: f64, current: f64) -> bool {
    let drift = expired - current;
    (drift > 0.0 && drift < SMALL_DRIFT_MAX) || drift < LARGE_NEGATIVE_DRIFT
}

/// Repeated warnings in one chain are one burst; only a new chain can emit.
pub(super) fn bad_player_movement(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let header = header(caps)?;
    if !store.observe_move_chain(header.chain_id) {
        return Ok(None);
    }

    let expired: f64 = number(caps, 3, "timestamp_expired")?;
    let current: f64 = number(caps, 4, "current_timestamp")?;
    if !suspicious_drift(expired, current) {
        return Ok(None);
    }

    let probability = if current < UNLIKELY_BELOW_TIMESTAMP {
        CheatProbability::Unlikely
    } else {
        CheatProbability::High
    };
    Ok(Some(LogEvent::MovementAnomaly {
        header,
        character_name: text(caps, 5).to_string(),
        probability,
    }))
}

/// Fires when the trace repeats the previous one in second, chain and
/// instigator.
pub(super) fn apply_explosive_damage(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let header = header_from(caps, 1, 3)?;
    let instigator = text(caps, 4).to_string();
    let trace = ExplosionTrace {
        second: text(caps, 2).to_string(),
        chain_id: header.chain_id,
        instigator: instigator.clone(),
    };

    if store.observe_explosion(trace) {
        Ok(Some(LogEvent::ExplosionAttack { header, instigator }))
    } else {
        Ok(None)
    }
}
