//! Join, login, disconnect and account-link lines.
//!
//! A join request carries the log-side name of the connecting player; the
//! login line that follows under the same chain id carries the platform ids.
//! Only the pair together describes the connection.

use super::{header, text};
use crate::error::LogRuleError;
use crate::log_parser::{CorrelationStore, LogEvent};
use regex::Captures;
use squad_event_system::{EosId, SteamId};
use tokio::time::Instant;
use tracing::debug;

pub(super) const JOIN_REQUEST: &str =
    log_line!(r"LogNet: Join request: .+\?Name=(.+)\?SplitscreenCount=\d");

pub(super) const PLAYER_CONNECTED: &str = log_line!(
    r"LogSquad: PostLogin: NewPlayer: BP_PlayerController_C .+PersistentLevel\.([^\s]+) \(IP: ([\d.]+) \| Online IDs: EOS: ([0-9a-f]{32}) steam: (\d+)\)"
);

pub(super) const PLAYER_DISCONNECTED: &str = log_line!(
    r"LogNet: UChannel::Close: Sending CloseBunch\. ChIndex == [0-9]+\. Name: \[UChannel\] ChIndex: [0-9]+, Closing: [0-9]+ \[UNetConnection\] RemoteAddr: ([\d.]+):[\d]+, Name: EOSIpNetConnection_[0-9]+, Driver: GameNetDriver EOSNetDriver_[0-9]+, IsServer: YES, PC: ([^ ]+PlayerController_C_[0-9]+), Owner: [^ ]+PlayerController_C_[0-9]+, UniqueId: RedpointEOS:([\da-f]+)"
);

pub(super) const EXTERNAL_ACCOUNT_INFO: &str = log_line!(
    r"LogEOS: Verbose: \[LogEOSConnect\] FConnectClient::CacheExternalAccountInfo - ProductUserId: ([0-9a-f]{32}), AccountType: (\d), AccountId: ([0-9]{17})"
);

pub(super) fn join_request(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let header = header(caps)?;
    let suffix = text(caps, 3).to_string();
    debug!("🚪 Join request {} for {}", header.chain_id, suffix);
    store.pending().insert(header.chain_id, suffix, now);
    Ok(None)
}

/// A login without its join request is incomplete and yields nothing.
pub(super) fn player_connected(
    caps: &Captures<'_>,
    store: &mut CorrelationStore,
    now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    let header = header(caps)?;
    let steam_id: SteamId = super::number(caps, 6, "steam_id")?;

    let request = store
        .pending()
        .take(header.chain_id, now)
        .ok_or(LogRuleError::MissingJoinRequest(header.chain_id))?;

    let controller = Some(text(caps, 3).to_string()).filter(|c| !c.is_empty());
    store.record_player(steam_id, Some(request.suffix.clone()), controller.clone());

    Ok(Some(LogEvent::PlayerConnected {
        header,
        ip: text(caps, 4).to_string(),
        eos_id: EosId::new(text(caps, 5)),
        steam_id,
        player_suffix: request.suffix,
        player_controller: controller,
    }))
}

pub(super) fn player_disconnected(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::PlayerDisconnected {
        header: header(caps)?,
        ip: text(caps, 3).to_string(),
        player_controller: text(caps, 4).to_string(),
        eos_id: EosId::new(text(caps, 5)),
    }))
}

pub(super) fn external_account_info(
    caps: &Captures<'_>,
    _store: &mut CorrelationStore,
    _now: Instant,
) -> Result<Option<LogEvent>, LogRuleError> {
    Ok(Some(LogEvent::ExternalAccountInfo {
        header: header(caps)?,
        eos_id: EosId::new(text(caps, 3)),
        steam_id: super::number(caps, 5, "steam_id")?,
    }))
}
