//! Core engine implementation.
//!
//! [`SquadServer`] owns every component of the engine and the handles of the
//! tasks it spawns. It wires the log ingestion path and the control-channel
//! event stream into the [`EventRouter`], and drives the four reconciliation
//! loops.

use super::handlers::EventRouter;
use crate::admins::AdminDirectory;
use crate::collaborators::{AdminSource, ControlChannel, LayerSource, LogReader};
use crate::config::EngineConfig;
use crate::error::ServerError;
use crate::identity::IdentityResolver;
use crate::layers::{parse_layer_listing, LayerCatalog, ReconcileReport};
use crate::log_parser::LogEventExtractor;
use crate::state::ServerState;
use crate::sync::{run_logged, spawn_sync_loop, LayerInfoSync, RosterSync, ServerInfoSync, SquadSync, SyncCycle};
use futures::future::join_all;
use squad_event_system::{EosId, EventSystem, Player};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub const LIST_LAYERS_COMMAND: &str = "ListLayers";

/// Handles of everything spawned by [`SquadServer::watch`].
struct RunningTasks {
    ingest_shutdown: broadcast::Sender<()>,
    ingest: JoinHandle<()>,
    shutdown: broadcast::Sender<()>,
    control_events: JoinHandle<()>,
    loops: Vec<JoinHandle<()>>,
}

/// The event correlation and state reconciliation engine.
///
/// # Lifecycle
///
/// 1. [`SquadServer::new`] builds state, catalog, resolver and loops
/// 2. [`SquadServer::watch`] loads the catalog and admin lists, connects,
///    primes state and spawns the tasks
/// 3. [`SquadServer::unwatch`] stops log ingestion, cancels the loops and
///    closes the control channel, in that order
pub struct SquadServer {
    config: EngineConfig,
    events: Arc<EventSystem>,
    control: Arc<dyn ControlChannel>,
    log_reader: Arc<dyn LogReader>,
    state: Arc<ServerState>,
    catalog: Arc<LayerCatalog>,
    identity: Arc<IdentityResolver>,
    admins: Arc<AdminDirectory>,
    extractor: Arc<Mutex<LogEventExtractor>>,
    router: Arc<EventRouter>,
    squads: Arc<SquadSync>,
    roster: Arc<RosterSync>,
    layer_info: Arc<LayerInfoSync>,
    server_info: Arc<ServerInfoSync>,
    running: Mutex<Option<RunningTasks>>,
}

impl SquadServer {
    pub fn new(
        config: EngineConfig,
        events: Arc<EventSystem>,
        control: Arc<dyn ControlChannel>,
        log_reader: Arc<dyn LogReader>,
        layer_source: Arc<dyn LayerSource>,
    ) -> Self {
        let state = Arc::new(ServerState::new());
        let catalog = Arc::new(LayerCatalog::new(layer_source));
        let identity = Arc::new(IdentityResolver::new(state.clone()));
        let admins = Arc::new(AdminDirectory::new(state.clone()));
        let extractor = Arc::new(Mutex::new(LogEventExtractor::new(&config)));
        let player_info: Arc<Mutex<HashMap<EosId, Player>>> = Arc::new(Mutex::new(HashMap::new()));

        let roster = Arc::new(RosterSync::new(
            control.clone(),
            state.clone(),
            extractor.clone(),
            events.clone(),
            player_info.clone(),
        ));
        identity.set_refresher(roster.clone());

        let squads = Arc::new(SquadSync::new(control.clone(), state.clone(), events.clone()));
        let layer_info = Arc::new(LayerInfoSync::new(
            control.clone(),
            catalog.clone(),
            state.clone(),
            events.clone(),
            config.clone(),
        ));
        let server_info = Arc::new(ServerInfoSync::new(
            control.clone(),
            catalog.clone(),
            state.clone(),
            events.clone(),
        ));

        let router = Arc::new(EventRouter::new(
            config.clone(),
            events.clone(),
            identity.clone(),
            catalog.clone(),
            state.clone(),
            control.clone(),
            admins.clone(),
            player_info,
        ));

        Self {
            config,
            events,
            control,
            log_reader,
            state,
            catalog,
            identity,
            admins,
            extractor,
            router,
            squads,
            roster,
            layer_info,
            server_info,
            running: Mutex::new(None),
        }
    }

    /// Starts the engine.
    ///
    /// A catalog or layer-listing failure only degrades layer resolution; a
    /// control channel or log reader that cannot start fails the call.
    pub async fn watch(&self) -> Result<(), ServerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        info!("🚀 Starting squad server engine");

        match self.catalog.pull(false).await {
            Ok(count) => info!("🗺️ Layer catalog holds {} layers", count),
            Err(e) => warn!("⚠️ Layer catalog unavailable: {}", e),
        }

        match self.admins.refresh().await {
            Ok(count) => debug!("🛡️ {} admins known", count),
            Err(e) => warn!("⚠️ Admin lists unavailable: {}", e),
        }

        self.control.connect().await?;
        info!("🔌 Control channel connected");

        if let Err(e) = self.refresh_layer_list(false).await {
            warn!("⚠️ Could not reconcile the layer catalog: {}", e);
        }

        let lines = match self.log_reader.watch().await {
            Ok(lines) => lines,
            Err(e) => {
                if let Err(close) = self.control.disconnect().await {
                    warn!("⚠️ Control channel did not close cleanly: {}", close);
                }
                return Err(e.into());
            }
        };
        let (ingest_shutdown, ingest_rx) = broadcast::channel(1);
        let ingest = self.spawn_log_ingestion(lines, ingest_rx);

        let (shutdown, _) = broadcast::channel(1);
        let control_events = self.spawn_control_events(shutdown.subscribe());

        // Squads first so the roster can attach them, layers before server
        // information so the latter only re-resolves on a real change.
        let initial: [&dyn SyncCycle; 4] = [
            self.squads.as_ref(),
            self.roster.as_ref(),
            self.layer_info.as_ref(),
            self.server_info.as_ref(),
        ];
        for cycle in initial {
            run_logged(cycle).await;
        }

        let loops = vec![
            spawn_sync_loop(self.squads.clone(), self.config.squad_list_interval(), shutdown.subscribe()),
            spawn_sync_loop(self.roster.clone(), self.config.player_list_interval(), shutdown.subscribe()),
            spawn_sync_loop(
                self.layer_info.clone(),
                self.config.layer_info_interval(),
                shutdown.subscribe(),
            ),
            spawn_sync_loop(
                self.server_info.clone(),
                self.config.server_info_interval(),
                shutdown.subscribe(),
            ),
        ];

        *running = Some(RunningTasks {
            ingest_shutdown,
            ingest,
            shutdown,
            control_events,
            loops,
        });
        info!("✅ Squad server engine watching");
        Ok(())
    }

    /// Stops the engine. Calling this on an engine that is not running is a
    /// no-op.
    pub async fn unwatch(&self) -> Result<(), ServerError> {
        let Some(tasks) = self.running.lock().await.take() else {
            debug!("Engine is not running");
            return Ok(());
        };

        info!("🧹 Stopping squad server engine...");

        if let Err(e) = self.log_reader.unwatch().await {
            warn!("⚠️ Log reader did not stop cleanly: {}", e);
        }
        let _ = tasks.ingest_shutdown.send(());
        if let Err(e) = tasks.ingest.await {
            error!("❌ Log ingestion task failed: {}", e);
        }

        let _ = tasks.shutdown.send(());
        if let Err(e) = tasks.control_events.await {
            error!("❌ Control event task failed: {}", e);
        }
        for result in join_all(tasks.loops).await {
            if let Err(e) = result {
                error!("❌ Reconciliation loop failed: {}", e);
            }
        }

        if let Err(e) = self.control.disconnect().await {
            warn!("⚠️ Control channel did not close cleanly: {}", e);
        }

        info!("✅ Squad server engine stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Pulls the catalog (forcing a re-fetch when asked) and reconciles it
    /// against the layers the server reports.
    pub async fn refresh_layer_list(&self, force: bool) -> Result<ReconcileReport, ServerError> {
        self.catalog.pull(force).await?;
        let listing = self.control.execute(LIST_LAYERS_COMMAND).await?;
        let live = parse_layer_listing(&listing);
        let report = self.catalog.reconcile_with_live(&live).await;
        info!(
            "🗺️ Catalog reconciled: {} removed, {} synthesized, {} unparseable",
            report.removed.len(),
            report.synthesized.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Installs the source of the admin lists. Takes effect on the next
    /// refresh.
    pub fn set_admin_source(&self, source: Arc<dyn AdminSource>) {
        self.admins.set_source(source);
    }

    /// Re-reads the admin lists and returns the number of admins held.
    pub async fn refresh_admins(&self) -> Result<usize, ServerError> {
        self.admins.refresh().await
    }

    fn spawn_log_ingestion(
        &self,
        mut lines: mpsc::Receiver<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let extractor = self.extractor.clone();
        let router = self.router.clone();
        tokio::spawn(async move {
            info!("📜 Log ingestion started");
            loop {
                let line = tokio::select! {
                    _ = shutdown.recv() => break,
                    line = lines.recv() => match line {
                        Some(line) => line,
                        None => break,
                    },
                };

                let extracted = extractor.lock().await.try_extract(&line, Instant::now());
                match extracted {
                    Ok(Some(event)) => {
                        let kind = event.kind();
                        if let Err(e) = router.handle_log_event(event).await {
                            error!("❌ Failed to publish {}: {}", kind, e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("⚠️ Dropped log line: {}", e),
                }
            }
            let (seen, matched) = extractor.lock().await.stats();
            info!("🛑 Log ingestion stopped after {} lines, {} matched", seen, matched);
        })
    }

    fn spawn_control_events(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let mut stream = self.control.subscribe();
        let router = self.router.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = shutdown.recv() => break,
                    event = stream.recv() => event,
                };
                match event {
                    Ok(event) => {
                        if let Err(e) = router.handle_control_event(event).await {
                            error!("❌ Failed to publish control event: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("⚠️ Control event stream lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Control event task stopped");
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> Arc<EventSystem> {
        self.events.clone()
    }

    pub fn state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    pub fn catalog(&self) -> Arc<LayerCatalog> {
        self.catalog.clone()
    }

    pub fn identity(&self) -> Arc<IdentityResolver> {
        self.identity.clone()
    }

    pub fn control(&self) -> Arc<dyn ControlChannel> {
        self.control.clone()
    }
}
