//! Engine composition: the [`SquadServer`] and the event enrichment router.

mod control_events;
mod core;
mod handlers;
mod log_events;

pub use self::core::{SquadServer, LIST_LAYERS_COMMAND};
pub use handlers::EventRouter;
