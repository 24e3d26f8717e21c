//! Entities: host-owned islands of content inside the document.
//!
//! Provides:
//! - `EntityPluginState` - registry of known entities and their ids
//! - `EntityPlugin` - lifecycle events, unique ids and delimiter upkeep
//! - delimiter helpers for read-only inline wrappers

pub mod delimiter;
mod plugin;
mod state;

pub use delimiter::{
    add_delimiters_if_needed, find_invalid_delimiters, find_undelimited_entities,
    is_entity_delimiter, normalize_delimiters, remove_invalid_delimiters,
};
pub use plugin::EntityPlugin;
pub use state::{EntityEntry, EntityPluginState};
