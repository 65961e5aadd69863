//! # Squad Event System
//!
//! A typed publish/subscribe bus plus the domain model for a live game-server
//! operations layer. The engine in `squad_server` publishes normalized events
//! here; plugins subscribe to them by topic name.
//!
//! ## Topics
//!
//! - `server:<event>` - engine events, names in [`server_events::names`]
//! - `command:<word>` - chat commands (`!admin help` is published on `command:admin`)
//! - `plugin:<plugin>:<event>` - plugin-to-plugin traffic
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use squad_event_system::*;
//!
//! let events = create_squad_event_system();
//!
//! let id = events.on_server(names::TEAMKILL, |event: PlayerDamageEvent| {
//!     println!("{:?} teamkilled {}", event.attacker_controller, event.victim_name);
//!     Ok(())
//! }).await?;
//!
//! // Unmounting a plugin is just dropping its subscriptions.
//! events.unsubscribe(id).await?;
//! ```

pub mod events;
pub mod server_events;
pub mod system;
pub mod types;

pub use events::{AsyncTypedEventHandler, Event, EventError, EventHandler, TypedEventHandler};
pub use server_events::*;
pub use system::{EventSystem, EventSystemStats, SubscriptionId};
pub use types::*;

use std::sync::Arc;

/// Creates a new event system instance ready to be shared.
pub fn create_squad_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}
