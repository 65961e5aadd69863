//! # Squad Server - Event Correlation and State Reconciliation
//!
//! The engine between a dedicated squad game server and the plugins that
//! react to it. It consumes two independent, lossy views of the server and
//! publishes one consistent stream of typed events.
//!
//! ## Inputs
//!
//! * **Control channel** ([`ControlChannel`]) - polled for the roster, the
//!   squad list, the current and next map and the server information, and
//!   subscribed to for already-framed events (chat, admin camera, moderation)
//! * **Server log** ([`LogReader`]) - raw lines, turned into domain events by
//!   the [`LogEventExtractor`] rule table
//! * **Layer catalog** ([`LayerSource`]) - the known map/mode/faction layers
//! * **Admin lists** ([`AdminSource`], optional) - who may do what, re-read
//!   on every new game
//!
//! ## Architecture
//!
//! * [`log_parser`] - ordered regex rules plus the [`CorrelationStore`] that
//!   joins multi-line sequences (connect handshake, round result, possession)
//! * [`identity`] - exactly-one-match player lookups over the roster
//! * [`sync`] - the four reconciliation loops; each commits a whole new
//!   snapshot and diffs against the one it started from
//! * [`layers`] - the catalog and the layer-name grammar used to synthesize
//!   layers the catalog does not know
//! * [`server`] - [`SquadServer`], which wires everything together and
//!   republishes enriched events on the [`EventSystem`]
//! * [`admins`] - the admin permission index
//! * [`plugins`] - in-process plugin mount/unmount
//!
//! ## Usage
//!
//! ```rust,ignore
//! let events = create_squad_event_system();
//! let server = SquadServer::new(EngineConfig::default(), events.clone(), control, log_reader, layer_source);
//!
//! events.on_server(names::PLAYER_CONNECTED, |event: PlayerConnectedEvent| {
//!     println!("{} connected", event.player.name);
//!     Ok(())
//! }).await?;
//!
//! server.watch().await?;
//! // ...
//! server.unwatch().await?;
//! ```
//!
//! ## Error Handling
//!
//! A failing reconciliation cycle is logged and the loop re-arms; a log line
//! whose correlation cannot complete is dropped with a warning. Neither stops
//! the engine. Startup fails only when the control channel or log reader
//! cannot start.

pub mod admins;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod identity;
pub mod layers;
pub mod log_parser;
pub mod plugins;
pub mod server;
pub mod state;
pub mod sync;

pub use admins::{AdminDirectory, AdminIndex, AdminPermissions};
pub use collaborators::{AdminSource, ControlChannel, ControlEvent, FetchedPlayer, LayerSource, LogReader, MapInfo};
pub use config::EngineConfig;
pub use error::{AdminListError, CatalogError, ControlError, LogReaderError, LogRuleError, ServerError};
pub use identity::{IdentityResolver, Lookup, PlayerKey};
pub use layers::{LayerCatalog, ReconcileReport};
pub use log_parser::{CorrelationStore, LogEvent, LogEventExtractor};
pub use plugins::{Plugin, PluginContext, PluginManager};
pub use server::{EventRouter, SquadServer};
pub use state::{LayerState, ServerState, Snapshot, StateCell};

pub use squad_event_system::{create_squad_event_system, names, EventSystem};
