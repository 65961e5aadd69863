//! Configuration loading and validation.
//!
//! The application reads one TOML file. A missing file is replaced by a
//! freshly written default so a first run always starts.

use serde::{Deserialize, Serialize};
use squad_server::EngineConfig;
use std::path::{Path, PathBuf};
use tracing::info;

fn default_poll_interval_ms() -> u64 {
    250
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine tunables
    #[serde(default)]
    pub engine: EngineConfig,
    /// Where the server log comes from
    #[serde(default)]
    pub log_source: LogSourceSettings,
    /// Where the layer catalog comes from
    #[serde(default)]
    pub catalog: CatalogSettings,
    /// Admin lists to load
    #[serde(default)]
    pub admins: AdminListSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSourceSettings {
    /// Server log file to follow
    pub path: PathBuf,
    /// Replay the existing file before following it
    #[serde(default)]
    pub from_start: bool,
    /// How long to wait at end of file before reading again
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LogSourceSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("SquadGame.log"),
            from_start: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// JSON file holding an array of layers
    pub path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("layers.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminListSettings {
    /// `Admins.cfg` style files, merged in order. Empty disables admin lists.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, creating a default one first if
    /// the path does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.engine.validate()?;

        if self.log_source.path.as_os_str().is_empty() {
            return Err("Log source path cannot be empty".to_string());
        }
        if self.log_source.poll_interval_ms == 0 {
            return Err("Log source poll_interval_ms must be greater than zero".to_string());
        }
        if self.catalog.path.as_os_str().is_empty() {
            return Err("Catalog path cannot be empty".to_string());
        }
        if self.admins.paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err("Admin list paths cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }

        Ok(())
    }
}
