//! The publish/subscribe bus.
//!
//! Topics are plain string keys in three namespaces:
//!
//! * `server:<event>` - events published by the engine (`player_connected`, `new_game`, ...)
//! * `command:<name>` - chat commands, one topic per command word
//! * `plugin:<plugin>:<event>` - plugin-to-plugin traffic

use crate::events::{AsyncTypedEventHandler, Event, EventError, EventHandler, TypedEventHandler};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// Handle returned by every registration; pass it to
/// [`EventSystem::unsubscribe`] to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Statistics about the bus, useful for health logging.
#[derive(Debug, Default, Clone)]
pub struct EventSystemStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Total number of events emitted since system start
    pub events_emitted: u64,
    /// Emissions that found no subscriber
    pub events_unhandled: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
}

struct Registration {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

/// The core event system that manages event routing and handler execution.
///
/// Handlers for the same key run sequentially in registration order. A failing
/// handler is logged and counted but never prevents the remaining handlers from
/// running, and never fails the emission.
pub struct EventSystem {
    handlers: RwLock<HashMap<String, Vec<Registration>>>,
    stats: RwLock<EventSystemStats>,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("handlers", &"[handlers]")
            .field("stats", &"[stats]")
            .finish()
    }
}

impl EventSystem {
    /// Creates a new event system with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventSystemStats::default()),
        }
    }

    /// Registers a handler for an engine-published event.
    ///
    /// ```rust,ignore
    /// events.on_server("player_connected", |event: PlayerConnectedEvent| {
    ///     println!("{} connected", event.player.name);
    ///     Ok(())
    /// }).await?;
    /// ```
    pub async fn on_server<T, F>(&self, event_name: &str, handler: F) -> Result<SubscriptionId, EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("server:{}", event_name);
        self.register_typed_handler(event_key, handler).await
    }

    /// Registers an awaiting handler for an engine-published event.
    pub async fn on_server_async<T, F, Fut>(
        &self,
        event_name: &str,
        handler: F,
    ) -> Result<SubscriptionId, EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        let event_key = format!("server:{}", event_name);
        self.register_async_handler(event_key, handler).await
    }

    /// Registers a handler for a chat command. `command` is matched
    /// case-insensitively since the engine lowercases command words.
    pub async fn on_command<T, F>(&self, command: &str, handler: F) -> Result<SubscriptionId, EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("command:{}", command.to_lowercase());
        self.register_typed_handler(event_key, handler).await
    }

    /// Registers a handler for plugin-to-plugin events.
    pub async fn on_plugin<T, F>(
        &self,
        plugin_name: &str,
        event_name: &str,
        handler: F,
    ) -> Result<SubscriptionId, EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("plugin:{}:{}", plugin_name, event_name);
        self.register_typed_handler(event_key, handler).await
    }

    async fn register_typed_handler<T, F>(&self, event_key: String, handler: F) -> Result<SubscriptionId, EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{}::{}", event_key, T::type_name());
        let handler: Arc<dyn EventHandler> = Arc::new(TypedEventHandler::new(handler_name, handler));
        Ok(self.insert_handler(event_key, handler).await)
    }

    async fn register_async_handler<T, F, Fut>(
        &self,
        event_key: String,
        handler: F,
    ) -> Result<SubscriptionId, EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        let handler_name = format!("{}::{}", event_key, T::type_name());
        let handler: Arc<dyn EventHandler> = Arc::new(AsyncTypedEventHandler::new(handler_name, handler));
        Ok(self.insert_handler(event_key, handler).await)
    }

    async fn insert_handler(&self, event_key: String, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId::new();
        let mut handlers = self.handlers.write().await;
        handlers
            .entry(event_key.clone())
            .or_default()
            .push(Registration { id, handler });

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        info!("📝 Registered handler for {}", event_key);
        id
    }

    /// Removes a single handler registration.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), EventError> {
        let mut handlers = self.handlers.write().await;
        let mut removed = false;
        handlers.retain(|_, registrations| {
            let before = registrations.len();
            registrations.retain(|registration| registration.id != id);
            removed |= registrations.len() != before;
            !registrations.is_empty()
        });

        if !removed {
            return Err(EventError::UnknownSubscription(id.to_string()));
        }

        let mut stats = self.stats.write().await;
        stats.total_handlers = stats.total_handlers.saturating_sub(1);
        debug!("🗑️ Removed subscription {}", id);
        Ok(())
    }

    /// Emits an engine event to all registered handlers.
    pub async fn emit_server<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("server:{}", event_name);
        self.emit_event(&event_key, event).await
    }

    /// Emits a chat command event.
    pub async fn emit_command<T>(&self, command: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("command:{}", command.to_lowercase());
        self.emit_event(&event_key, event).await
    }

    /// Emits a plugin event to all registered handlers.
    pub async fn emit_plugin<T>(&self, plugin_name: &str, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("plugin:{}:{}", plugin_name, event_name);
        self.emit_event(&event_key, event).await
    }

    /// Serializes once, then dispatches to every handler registered under
    /// `event_key`. The handler list is cloned out of the lock first so a
    /// handler may itself subscribe, unsubscribe or emit.
    async fn emit_event<T>(&self, event_key: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data = event.serialize()?;
        let event_handlers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().await;
            handlers
                .get(event_key)
                .map(|registrations| registrations.iter().map(|r| r.handler.clone()).collect())
                .unwrap_or_default()
        };

        if event_handlers.is_empty() {
            trace!("No handlers for event: {}", event_key);
            let mut stats = self.stats.write().await;
            stats.events_emitted += 1;
            stats.events_unhandled += 1;
            return Ok(());
        }

        debug!("📤 Emitting {} to {} handlers", event_key, event_handlers.len());

        let mut failures = 0u64;
        for handler in &event_handlers {
            if let Err(e) = handler.handle(&data).await {
                error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                failures += 1;
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handler_failures += failures;
        Ok(())
    }

    /// Checks if handlers are registered for a full event key such as `server:new_game`.
    pub async fn has_handlers(&self, event_key: &str) -> bool {
        let handlers = self.handlers.read().await;
        handlers.contains_key(event_key)
    }

    /// Gets the number of handlers for a full event key.
    pub async fn get_handler_count(&self, event_key: &str) -> usize {
        let handlers = self.handlers.read().await;
        handlers.get(event_key).map(|h| h.len()).unwrap_or(0)
    }

    /// Returns current system statistics.
    pub async fn get_stats(&self) -> EventSystemStats {
        self.stats.read().await.clone()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
