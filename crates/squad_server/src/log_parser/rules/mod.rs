//! The static rule table.
//!
//! Order matters only for lines that more than one pattern could match; the
//! patterns below are disjoint on the log lines the server writes, so the
//! order simply groups rules by concern.

/// Prefix of every rule: `[<time>][<chain>]`.
macro_rules! log_line {
    ($body:literal) => {
        concat!(r"^\[([0-9.:-]+)\]\[([ 0-9]*)\]", $body)
    };
}

mod anticheat;
mod combat;
mod connection;
mod game;
mod possession;

use super::{CorrelationStore, LineHeader, LogEvent};
use crate::error::LogRuleError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tokio::time::Instant;
use tracing::error;

pub(super) type RuleHandler =
    fn(&Captures<'_>, &mut CorrelationStore, Instant) -> Result<Option<LogEvent>, LogRuleError>;

pub(super) struct LogRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub handler: RuleHandler,
}

const TABLE: &[(&str, &str, RuleHandler)] = &[
    ("admin-broadcast", game::ADMIN_BROADCAST, game::admin_broadcast),
    ("deployable-damaged", game::DEPLOYABLE_DAMAGED, game::deployable_damaged),
    ("new-game", game::NEW_GAME, game::new_game),
    ("round-team-outcome", game::ROUND_TEAM_OUTCOME, game::round_team_outcome),
    ("round-ended", game::ROUND_ENDED, game::round_ended),
    ("tick-rate", game::TICK_RATE, game::tick_rate),
    ("join-request", connection::JOIN_REQUEST, connection::join_request),
    ("player-connected", connection::PLAYER_CONNECTED, connection::player_connected),
    ("player-disconnected", connection::PLAYER_DISCONNECTED, connection::player_disconnected),
    ("external-account-info", connection::EXTERNAL_ACCOUNT_INFO, connection::external_account_info),
    ("player-damaged", combat::PLAYER_DAMAGED, combat::player_damaged),
    ("player-wounded", combat::PLAYER_WOUNDED, combat::player_wounded),
    ("player-died", combat::PLAYER_DIED, combat::player_died),
    ("player-revived", combat::PLAYER_REVIVED, combat::player_revived),
    ("player-possess", possession::PLAYER_POSSESS, possession::player_possess),
    ("player-unpossess", possession::PLAYER_UNPOSSESS, possession::player_unpossess),
    ("bad-player-movement", anticheat::BAD_PLAYER_MOVEMENT, anticheat::bad_player_movement),
    ("apply-explosive-damage", anticheat::APPLY_EXPLOSIVE_DAMAGE, anticheat::apply_explosive_damage),
];

pub(super) static RULES: Lazy<Vec<LogRule>> = Lazy::new(|| {
    TABLE
        .iter()
        .filter_map(|&(name, pattern, handler)| match Regex::new(pattern) {
            Ok(pattern) => Some(LogRule { name, pattern, handler }),
            Err(e) => {
                error!("❌ Log rule {} has an invalid pattern: {}", name, e);
                None
            }
        })
        .collect()
});

#[cfg(test)]
pub(super) fn rule_count() -> usize {
    TABLE.len()
}

/// Group `index` as a string slice; empty when the group did not take part.
pub(super) fn text<'c>(caps: &'c Captures<'_>, index: usize) -> &'c str {
    caps.get(index).map_or("", |m| m.as_str())
}

pub(super) fn number<T: std::str::FromStr>(
    caps: &Captures<'_>,
    index: usize,
    field: &'static str,
) -> Result<T, LogRuleError> {
    let value = text(caps, index).trim();
    value.parse().map_err(|_| LogRuleError::BadField {
        field,
        value: value.to_string(),
    })
}

/// Header for the standard `[time][chain]` prefix.
pub(super) fn header(caps: &Captures<'_>) -> Result<LineHeader, LogRuleError> {
    header_from(caps, 1, 2)
}

pub(super) fn header_from(caps: &Captures<'_>, time: usize, chain: usize) -> Result<LineHeader, LogRuleError> {
    let chain_text = text(caps, chain).trim();
    let chain_id = if chain_text.is_empty() {
        0
    } else {
        number(caps, chain, "chain_id")?
    };
    Ok(LineHeader {
        raw: text(caps, 0).to_string(),
        time: text(caps, time).to_string(),
        chain_id,
    })
}
