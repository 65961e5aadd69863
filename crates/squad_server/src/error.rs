//! Error types for the engine and its collaborators.
//!
//! None of these are fatal to the engine: loops catch them at the cycle
//! boundary, log, and re-arm.

use squad_event_system::EventError;

/// Failures reported by the control channel.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Control channel not connected")]
    NotConnected,
    #[error("Control channel transport error: {0}")]
    Transport(String),
    #[error("Malformed control channel response: {0}")]
    MalformedResponse(String),
}

/// Failures reported by the remote layer catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Layer catalog fetch failed: {0}")]
    Fetch(String),
    #[error("Layer catalog could not be decoded: {0}")]
    Decode(String),
}

/// Failures reported by the admin list source.
#[derive(Debug, thiserror::Error)]
pub enum AdminListError {
    #[error("Admin list fetch failed: {0}")]
    Fetch(String),
}

/// A log rule matched but could not complete its correlation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogRuleError {
    #[error("no pending join request for chain {0}")]
    MissingJoinRequest(u64),
    #[error("field {field} has unexpected value {value:?}")]
    BadField { field: &'static str, value: String },
}

/// Log transport failures.
#[derive(Debug, thiserror::Error)]
pub enum LogReaderError {
    #[error("Log reader I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Log reader is already watching")]
    AlreadyWatching,
}

/// Errors surfaced by the engine itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    AdminList(#[from] AdminListError),
    #[error(transparent)]
    LogReader(#[from] LogReaderError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("Plugin {name} failed: {reason}")]
    Plugin { name: String, reason: String },
    #[error("Engine is already running")]
    AlreadyRunning,
}
