//! Main application entry point.
//!
//! Loads configuration, wires the engine to a local log file and layer
//! catalog, and runs until a shutdown signal arrives.

mod adapters;
mod cli;
mod config;
mod logging;
mod signals;

use adapters::{AdminFilesSource, FileTailLogReader, JsonFileLayerSource, OfflineControlChannel};
use cli::CliArgs;
use config::AppConfig;
use squad_event_system::{
    names, NewGameEvent, PlayerCheatEvent, PlayerConnectedEvent, PlayerDisconnectedEvent, RoundEndedEvent,
};
use squad_server::{create_squad_event_system, EventSystem, SquadServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

pub struct Application {
    config: AppConfig,
    events: Arc<EventSystem>,
    server: SquadServer,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_file) = args.log_file {
            config.log_source.path = log_file;
        }
        if let Some(catalog) = args.catalog {
            config.catalog.path = catalog;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {}", e).into());
        }

        logging::setup_logging(&config.logging)?;

        let events = create_squad_event_system();
        let log_reader = Arc::new(FileTailLogReader::new(
            config.log_source.path.clone(),
            config.log_source.from_start,
            Duration::from_millis(config.log_source.poll_interval_ms),
        ));
        let server = SquadServer::new(
            config.engine.clone(),
            events.clone(),
            Arc::new(OfflineControlChannel::new()),
            log_reader,
            Arc::new(JsonFileLayerSource::new(config.catalog.path.clone())),
        );
        if !config.admins.paths.is_empty() {
            server.set_admin_source(Arc::new(AdminFilesSource::new(config.admins.paths.clone())));
        }

        info!(
            "📂 Config: {} | Log: {} | Catalog: {}",
            args.config_path.display(),
            config.log_source.path.display(),
            config.catalog.path.display()
        );
        Ok(Self { config, events, server })
    }

    /// Logs the events an operator watching the console cares about.
    async fn register_console_handlers(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.events
            .on_server(names::PLAYER_CONNECTED, |event: PlayerConnectedEvent| {
                info!("👋 {} connected from {}", event.player.name, event.ip);
                Ok(())
            })
            .await?;

        self.events
            .on_server(names::PLAYER_DISCONNECTED, |event: PlayerDisconnectedEvent| {
                let name = event.player.map(|p| p.name).unwrap_or_else(|| event.eos_id.to_string());
                info!("👋 {} disconnected", name);
                Ok(())
            })
            .await?;

        self.events
            .on_server(names::NEW_GAME, |event: NewGameEvent| {
                let layer = event.layer.map(|l| l.layer_id).unwrap_or(event.layer_classname);
                info!("🎮 New game on {}", layer);
                Ok(())
            })
            .await?;

        self.events
            .on_server(names::ROUND_ENDED, |event: RoundEndedEvent| {
                info!(
                    "🏁 {} won with {} tickets",
                    event.winner_faction.unwrap_or_else(|| "Nobody".to_string()),
                    event.winner_tickets.unwrap_or(0)
                );
                Ok(())
            })
            .await?;

        self.events
            .on_server(names::PLAYER_CHEAT, |event: PlayerCheatEvent| {
                let who = event.player.map(|p| p.name).unwrap_or(event.raw_id);
                warn!(
                    "🚨 {} suspected on {} ({})",
                    event.cheat_type,
                    who,
                    event.probability.as_deref().unwrap_or("high")
                );
                Ok(())
            })
            .await?;

        Ok(())
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting squad_watch v{}", env!("CARGO_PKG_VERSION"));
        info!("📋 Configuration Summary:");
        info!("  🔁 Player list every {}ms", self.config.engine.player_list_interval_ms);
        info!("  🔁 Squad list every {}ms", self.config.engine.squad_list_interval_ms);
        info!("  🔁 Layer information every {}ms", self.config.engine.layer_info_interval_ms);
        info!("  🔁 Server information every {}ms", self.config.engine.server_info_interval_ms);
        info!("  💬 Command prefix: {}", self.config.engine.command_prefix);
        info!("  🛡️ Admin lists: {}", self.config.admins.paths.len());

        self.register_console_handlers().await?;
        self.server.watch().await?;

        let monitoring_handle = {
            let events = self.events.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(HEALTH_INTERVAL);
                let mut last_events_emitted = 0u64;
                loop {
                    interval.tick().await;
                    let stats = events.get_stats().await;
                    let events_this_period = stats.events_emitted - last_events_emitted;
                    last_events_emitted = stats.events_emitted;
                    info!(
                        "📊 System Health - {} events/min | {} handlers | {} handler failures",
                        events_this_period, stats.total_handlers, stats.handler_failures
                    );
                }
            })
        };

        info!("✅ squad_watch is running, press Ctrl+C to stop");
        signals::wait_for_shutdown().await?;
        info!("🛑 Shutdown signal received, stopping...");

        monitoring_handle.abort();
        self.server.unwatch().await?;

        let final_stats = self.events.get_stats().await;
        info!("📊 Total events published: {}", final_stats.events_emitted);
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}
