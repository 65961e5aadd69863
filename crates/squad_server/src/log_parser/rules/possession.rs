//! Possess and unpossess lines.

use super::{header, text};
use crate::error::LogRuleError;
use crate::log_parser::{CorrelationStore, LogEvent};
use regex::Captures;
use squad_event_system::EosId;
use tokio::time::Instant;

pub(super) const PLAYER_POSSESS: &str = log_line!(
    r"LogSquadTrace: \[DedicatedServer\](?:ASQPlayerController::)?OnPossess\(\): PC=(.+?)(?: \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d+)\))? Pawn=(([A-z0-9_]+)_C_[0-9]+)"
);

pub(super) const PLAYER_UNPOSSESS: &str = log_line!(
    r"LogSquadTrace: \[DedicatedServer\](?:ASQPlayerController::)?OnUnPossess\(\): PC=(.+?)(?: \(Online IDs: EOS: ([0-9a-f]{32}) steam: (\d+)\))?$"
);

fn eos(caps: &Captures<'_>, index: usize) -> Option<EosId> {
    caps.get(index).map(|m| EosId::new(m.as_str()))
}

/// Remembers which chain the controller possessed in.
pub(super) fn player_possess(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let header = header(caps)?;
    let player_suffix = text(caps, 3).to_string();
    store.record_possess(&player_suffix, header.chain_id);

    Ok(Some(LogEvent::PlayerPossess {
        header,
        eos_id: eos(caps, 4),
        character_classname: text(caps, 6).to_string(),
        possess_classname: text(caps, 7).to_string(),
        player_suffix,
    }))
}

/// An unpossess in the same chain as the controller's last possess is a
/// switch between bodies.
pub(super) fn player_unpossess(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let header = header(caps)?;
    let player_suffix = text(caps, 3).to_string();
    let switch_possess = store.possess_chain(&player_suffix) == Some(header.chain_id);

    Ok(Some(LogEvent::PlayerUnpossess {
        header,
        eos_id: eos(caps, 4),
        player_suffix,
        switch_possess,
    }))
}
