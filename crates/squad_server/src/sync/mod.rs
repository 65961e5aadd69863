//! Reconciliation loops.
//!
//! Each loop is a [`SyncCycle`] driven by [`spawn_sync_loop`]: wait the
//! configured delay, run one cycle, log a failure if there was one, and wait
//! again. A failed cycle never stops the loop; only the shutdown signal does.

pub mod layer_info;
pub mod roster;
pub mod server_info;
pub mod squads;

pub use layer_info::LayerInfoSync;
pub use roster::{diff_rosters, RosterChange, RosterSync};
pub use server_info::{parse_server_info, ServerInfoSync};
pub use squads::SquadSync;

use crate::error::ServerError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// One fetch, diff and commit pass against the control channel.
#[async_trait]
pub trait SyncCycle: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_cycle(&self) -> Result<(), ServerError>;
}

/// Runs a single cycle, logging instead of propagating a failure.
pub async fn run_logged(cycle: &dyn SyncCycle) {
    debug!("🔄 Updating {}...", cycle.name());
    match cycle.run_cycle().await {
        Ok(()) => debug!("✅ Updated {}", cycle.name()),
        Err(e) => warn!("⚠️ Failed to update {}: {}", cycle.name(), e),
    }
}

/// Spawns the re-arming loop for `cycle`.
///
/// The loop sleeps `delay` before every cycle and exits as soon as `shutdown`
/// fires, including while a cycle is in flight.
pub fn spawn_sync_loop(
    cycle: Arc<dyn SyncCycle>,
    delay: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🔁 {} loop armed every {:?}", cycle.name(), delay);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = async {
                    sleep(delay).await;
                    run_logged(cycle.as_ref()).await;
                } => {}
            }
        }
        info!("🛑 {} loop stopped", cycle.name());
    })
}
