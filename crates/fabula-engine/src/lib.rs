//! Command orchestrator and event bus for Fabula.
//!
//! [`GameEngine`] is the single mutator of game state: it parses player
//! input, executes verbs, invokes the combat and trade resolvers, and
//! routes every resulting event synchronously through the script
//! interpreter. Hosts drive it with `apply_command` and `advance_turn`
//! and render the returned [`Narration`].

/// The event bus.
mod bus;
/// Engine configuration.
pub mod config;
/// Room and entity descriptions.
mod describe;
/// The command orchestrator.
pub mod engine;
/// Narration returned to the host.
pub mod narration;
/// Background turn processing.
mod turn;
/// Read-only UI projections.
pub mod views;

pub use config::EngineConfig;
pub use engine::GameEngine;
pub use narration::Narration;
pub use views::{InventoryEntry, QuestView, StatsView};
