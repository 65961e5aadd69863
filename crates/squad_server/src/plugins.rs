//! In-process plugin lifecycle.
//!
//! A plugin is mounted by letting it register handlers on the bus; the
//! manager owns the list the subscriptions are recorded in and removes them
//! again on unmount, or right away when the mount fails halfway.

use crate::collaborators::ControlChannel;
use crate::error::ServerError;
use crate::identity::IdentityResolver;
use crate::state::ServerState;
use async_trait::async_trait;
use squad_event_system::{EventSystem, SubscriptionId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// What a plugin gets to work with.
#[derive(Clone)]
pub struct PluginContext {
    pub events: Arc<EventSystem>,
    pub state: Arc<ServerState>,
    pub identity: Arc<IdentityResolver>,
    /// For moderation actions (warn, kick, ban).
    pub control: Arc<dyn ControlChannel>,
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Registers the plugin's handlers. Every subscription is pushed onto
    /// `subscriptions` as soon as it exists.
    async fn mount(
        &self,
        ctx: &PluginContext,
        subscriptions: &mut Vec<SubscriptionId>,
    ) -> Result<(), ServerError>;

    /// Runs after the plugin's subscriptions were removed.
    async fn unmount(&self, _ctx: &PluginContext) -> Result<(), ServerError> {
        Ok(())
    }
}

struct MountedPlugin {
    plugin: Arc<dyn Plugin>,
    subscriptions: Vec<SubscriptionId>,
}

/// Mounts and unmounts plugins against a shared [`PluginContext`].
pub struct PluginManager {
    ctx: PluginContext,
    mounted: RwLock<Vec<MountedPlugin>>,
}

impl PluginManager {
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            ctx,
            mounted: RwLock::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }

    /// Mounts `plugin` unless a plugin with the same name is mounted. The
    /// registry stays locked until the plugin finished registering.
    pub async fn mount(&self, plugin: Arc<dyn Plugin>) -> Result<(), ServerError> {
        let name = plugin.name().to_string();
        let mut mounted = self.mounted.write().await;
        if mounted.iter().any(|m| m.plugin.name() == name) {
            return Err(ServerError::Plugin {
                name,
                reason: "already mounted".to_string(),
            });
        }

        let mut subscriptions = Vec::new();
        if let Err(e) = plugin.mount(&self.ctx, &mut subscriptions).await {
            warn!("⚠️ Plugin {} failed to mount, dropping {} handler(s)", name, subscriptions.len());
            self.release(&name, subscriptions).await;
            return Err(ServerError::Plugin {
                name,
                reason: e.to_string(),
            });
        }
        info!("🔌 Mounted plugin {} with {} handler(s)", name, subscriptions.len());

        mounted.push(MountedPlugin { plugin, subscriptions });
        Ok(())
    }

    async fn release(&self, name: &str, subscriptions: Vec<SubscriptionId>) {
        for id in subscriptions {
            if let Err(e) = self.ctx.events.unsubscribe(id).await {
                warn!("⚠️ Plugin {} subscription already gone: {}", name, e);
            }
        }
    }

    pub async fn unmount(&self, name: &str) -> Result<(), ServerError> {
        let entry = {
            let mut mounted = self.mounted.write().await;
            let index = mounted
                .iter()
                .position(|m| m.plugin.name() == name)
                .ok_or_else(|| ServerError::Plugin {
                    name: name.to_string(),
                    reason: "not mounted".to_string(),
                })?;
            mounted.remove(index)
        };

        self.release(name, entry.subscriptions).await;
        entry.plugin.unmount(&self.ctx).await?;
        info!("🔌 Unmounted plugin {}", name);
        Ok(())
    }

    /// Unmounts everything in reverse mount order. Failures are logged and do
    /// not stop the remaining plugins from unmounting.
    pub async fn unmount_all(&self) {
        let names: Vec<String> = self.mounted_names().await.into_iter().rev().collect();
        for name in names {
            if let Err(e) = self.unmount(&name).await {
                error!("❌ Failed to unmount {}: {}", name, e);
            }
        }
    }

    pub async fn mounted_names(&self) -> Vec<String> {
        self.mounted
            .read()
            .await
            .iter()
            .map(|m| m.plugin.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ControlEvent, FetchedPlayer, MapInfo};
    use crate::error::ControlError;
    use squad_event_system::{names, EosId, Squad, SteamId, TickRateEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    struct NoControl;

    #[async_trait]
    impl ControlChannel for NoControl {
        async fn connect(&self) -> Result<(), ControlError> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<(), ControlError> {
            Ok(())
        }
        async fn execute(&self, _command: &str) -> Result<String, ControlError> {
            Err(ControlError::NotConnected)
        }
        async fn list_players(&self) -> Result<Vec<FetchedPlayer>, ControlError> {
            Ok(Vec::new())
        }
        async fn list_squads(&self) -> Result<Vec<Squad>, ControlError> {
            Ok(Vec::new())
        }
        async fn current_map(&self) -> Result<MapInfo, ControlError> {
            Err(ControlError::NotConnected)
        }
        async fn next_map(&self) -> Result<MapInfo, ControlError> {
            Err(ControlError::NotConnected)
        }
        fn add_ids(&self, _steam_id: SteamId, _eos_id: &EosId) {}
        fn steam_id_for(&self, _eos_id: &EosId) -> Option<SteamId> {
            None
        }
        async fn warn(&self, _target: &str, _message: &str) -> Result<(), ControlError> {
            Ok(())
        }
        async fn kick(&self, _target: &str, _reason: &str) -> Result<(), ControlError> {
            Ok(())
        }
        async fn ban(&self, _target: &str, _interval: &str, _reason: &str) -> Result<(), ControlError> {
            Ok(())
        }
        fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
            broadcast::channel(1).1
        }
    }

    struct TickCounter {
        ticks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for TickCounter {
        fn name(&self) -> &str {
            "tick_counter"
        }

        async fn mount(
            &self,
            ctx: &PluginContext,
            subscriptions: &mut Vec<SubscriptionId>,
        ) -> Result<(), ServerError> {
            let ticks = self.ticks.clone();
            let id = ctx
                .events
                .on_server(names::TICK_RATE, move |_: TickRateEvent| {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await?;
            subscriptions.push(id);
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    /// Registers one handler, then gives up.
    struct HalfMounted {
        ticks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for HalfMounted {
        fn name(&self) -> &str {
            "half_mounted"
        }

        async fn mount(
            &self,
            ctx: &PluginContext,
            subscriptions: &mut Vec<SubscriptionId>,
        ) -> Result<(), ServerError> {
            let ticks = self.ticks.clone();
            subscriptions.push(
                ctx.events
                    .on_server(names::TICK_RATE, move |_: TickRateEvent| {
                        ticks.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await?,
            );
            Err(ServerError::Plugin {
                name: "half_mounted".to_string(),
                reason: "webhook url missing".to_string(),
            })
        }
    }

    fn manager() -> PluginManager {
        let state = Arc::new(ServerState::new());
        PluginManager::new(PluginContext {
            events: Arc::new(EventSystem::new()),
            identity: Arc::new(IdentityResolver::new(state.clone())),
            state,
            control: Arc::new(NoControl),
        })
    }

    fn tick() -> TickRateEvent {
        TickRateEvent {
            raw: String::new(),
            time: "2023.10.08-17.42.11:517".to_string(),
            chain_id: 1,
            tick_rate: 49.8,
        }
    }

    #[tokio::test]
    async fn test_unmount_removes_handlers() {
        let manager = manager();
        let ticks = Arc::new(AtomicUsize::new(0));
        manager
            .mount(Arc::new(TickCounter { ticks: ticks.clone() }))
            .await
            .unwrap();

        let events = manager.context().events.clone();
        events.emit_server(names::TICK_RATE, &tick()).await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        manager.unmount("tick_counter").await.unwrap();
        events.emit_server(names::TICK_RATE, &tick()).await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(manager.mounted_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_double_mount_rejected() {
        let manager = manager();
        let ticks = Arc::new(AtomicUsize::new(0));
        manager
            .mount(Arc::new(TickCounter { ticks: ticks.clone() }))
            .await
            .unwrap();
        let second = manager.mount(Arc::new(TickCounter { ticks })).await;
        assert!(matches!(second, Err(ServerError::Plugin { .. })));
        assert_eq!(manager.mounted_names().await, vec!["tick_counter".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_mounts_of_one_name_admit_one() {
        let manager = manager();
        let ticks = Arc::new(AtomicUsize::new(0));
        let (first, second) = tokio::join!(
            manager.mount(Arc::new(TickCounter { ticks: ticks.clone() })),
            manager.mount(Arc::new(TickCounter { ticks: ticks.clone() })),
        );
        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);

        let events = manager.context().events.clone();
        assert_eq!(events.get_handler_count("server:tick_rate").await, 1);
        events.emit_server(names::TICK_RATE, &tick()).await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_mount_drops_its_handlers() {
        let manager = manager();
        let ticks = Arc::new(AtomicUsize::new(0));
        let mounted = manager.mount(Arc::new(HalfMounted { ticks: ticks.clone() })).await;
        assert!(matches!(mounted, Err(ServerError::Plugin { .. })));

        let events = manager.context().events.clone();
        assert_eq!(events.get_handler_count("server:tick_rate").await, 0);
        events.emit_server(names::TICK_RATE, &tick()).await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert!(manager.mounted_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_unmount_unknown_plugin() {
        let manager = manager();
        assert!(manager.unmount("nope").await.is_err());
        manager.unmount_all().await;
    }
}
