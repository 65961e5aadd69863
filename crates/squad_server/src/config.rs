//! Engine configuration types and defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    30_000
}

fn default_layer_history_max_length() -> usize {
    20
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_pending_connection_ttl_ms() -> u64 {
    120_000
}

fn default_pending_connection_capacity() -> usize {
    256
}

fn default_training_layer_name() -> String {
    "Jensen's Training Range".to_string()
}

fn default_vote_sentinel() -> String {
    "To be voted".to_string()
}

/// Tunables for the reconciliation loops and the log correlation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Re-arm delay of the roster loop in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub player_list_interval_ms: u64,
    /// Re-arm delay of the squad loop in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub squad_list_interval_ms: u64,
    /// Re-arm delay of the current/next layer loop in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub layer_info_interval_ms: u64,
    /// Re-arm delay of the server-information loop in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub server_info_interval_ms: u64,
    /// Number of played layers kept in the history
    #[serde(default = "default_layer_history_max_length")]
    pub layer_history_max_length: usize,
    /// Prefix that turns a chat line into a command
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Join requests whose login line never arrives are dropped after this long
    #[serde(default = "default_pending_connection_ttl_ms")]
    pub pending_connection_ttl_ms: u64,
    /// Hard cap on outstanding join requests; the oldest is evicted first
    #[serde(default = "default_pending_connection_capacity")]
    pub pending_connection_capacity: usize,
    /// Current-map name the layer loop never adopts
    #[serde(default = "default_training_layer_name")]
    pub training_layer_name: String,
    /// Next-map value meaning the next layer is decided by vote
    #[serde(default = "default_vote_sentinel")]
    pub vote_sentinel: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            player_list_interval_ms: default_poll_interval_ms(),
            squad_list_interval_ms: default_poll_interval_ms(),
            layer_info_interval_ms: default_poll_interval_ms(),
            server_info_interval_ms: default_poll_interval_ms(),
            layer_history_max_length: default_layer_history_max_length(),
            command_prefix: default_command_prefix(),
            pending_connection_ttl_ms: default_pending_connection_ttl_ms(),
            pending_connection_capacity: default_pending_connection_capacity(),
            training_layer_name: default_training_layer_name(),
            vote_sentinel: default_vote_sentinel(),
        }
    }
}

impl EngineConfig {
    pub fn player_list_interval(&self) -> Duration {
        Duration::from_millis(self.player_list_interval_ms)
    }

    pub fn squad_list_interval(&self) -> Duration {
        Duration::from_millis(self.squad_list_interval_ms)
    }

    pub fn layer_info_interval(&self) -> Duration {
        Duration::from_millis(self.layer_info_interval_ms)
    }

    pub fn server_info_interval(&self) -> Duration {
        Duration::from_millis(self.server_info_interval_ms)
    }

    pub fn pending_connection_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_connection_ttl_ms)
    }

    /// Checks the values the engine cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let intervals = [
            ("player_list_interval_ms", self.player_list_interval_ms),
            ("squad_list_interval_ms", self.squad_list_interval_ms),
            ("layer_info_interval_ms", self.layer_info_interval_ms),
            ("server_info_interval_ms", self.server_info_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(format!("{name} must be greater than zero"));
            }
        }
        if self.command_prefix.is_empty() {
            return Err("command_prefix cannot be empty".to_string());
        }
        if self.pending_connection_capacity == 0 {
            return Err("pending_connection_capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.player_list_interval(), Duration::from_secs(30));
        assert_eq!(config.layer_history_max_length, 20);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"squad_list_interval_ms": 5000}"#).unwrap();
        assert_eq!(config.squad_list_interval(), Duration::from_secs(5));
        assert_eq!(config.command_prefix, "!");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = EngineConfig {
            server_info_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("server_info_interval_ms"));
    }
}
