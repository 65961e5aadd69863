//! Squad list reconciliation. Squads are replaced wholesale every cycle.

use super::SyncCycle;
use crate::collaborators::ControlChannel;
use crate::error::ServerError;
use crate::state::ServerState;
use async_trait::async_trait;
use squad_event_system::{names, EventSystem, SquadListUpdatedEvent};
use std::sync::Arc;
use tracing::debug;

pub struct SquadSync {
    control: Arc<dyn ControlChannel>,
    state: Arc<ServerState>,
    events: Arc<EventSystem>,
}

impl SquadSync {
    pub fn new(control: Arc<dyn ControlChannel>, state: Arc<ServerState>, events: Arc<EventSystem>) -> Self {
        Self { control, state, events }
    }
}

#[async_trait]
impl SyncCycle for SquadSync {
    fn name(&self) -> &'static str {
        "squad list"
    }

    async fn run_cycle(&self) -> Result<(), ServerError> {
        let squads = self.control.list_squads().await?;
        let committed = self.state.squads.replace(squads).await;
        debug!("🪖 Squad list v{} with {} squads", committed.version, committed.value.len());

        self.events
            .emit_server(
                names::UPDATED_SQUAD_INFORMATION,
                &SquadListUpdatedEvent {
                    version: committed.version,
                    squad_count: committed.value.len(),
                },
            )
            .await?;
        Ok(())
    }
}
