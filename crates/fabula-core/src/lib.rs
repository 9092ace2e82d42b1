//! Core types for Fabula: the world model, game state, events, and
//! script-graph data.
//!
//! This crate defines the data the rest of the engine operates on. It is
//! independent of the parser and resolvers — a [`World`] can be built
//! programmatically by the authoring tools or deserialized from JSON, and
//! a [`GameState`] snapshot round-trips through serde so the external save
//! system can persist and restore a playthrough at any point.

/// The shared combat capability used by player and NPCs.
pub mod combatant;
/// The normalized command produced by the parser.
pub mod command;
/// Per-world alias tables for the parser.
pub mod dictionary;
/// Side-effect requests surfaced to the host.
pub mod effect;
/// Error types used throughout the crate.
pub mod error;
/// Domain events dispatched to the script interpreter.
pub mod event;
/// Author-defined boolean and integer registers.
pub mod flags;
/// Typed identifiers for authored content.
pub mod ids;
/// Non-player characters.
pub mod npc;
/// Objects: items, weapons, armor, consumables, containers.
pub mod object;
/// Quests and quest progress.
pub mod quest;
/// Rooms, exits, and doors.
pub mod room;
/// Script graph data.
pub mod script;
/// Ephemeral combat and trade sessions.
pub mod session;
/// The mutable runtime snapshot of one playthrough.
pub mod state;
/// The immutable authored world.
pub mod world;

pub use combatant::{Combatant, MagicDefense};
pub use command::{Command, NounPhrase, Resolution};
pub use dictionary::{Dictionary, Direction, NounRef, Preposition, Verb};
pub use effect::SideEffectRequest;
pub use error::{CoreError, CoreResult};
pub use event::{EventKind, EventScope, GameEvent};
pub use flags::FlagValue;
pub use ids::{DoorId, GraphId, NodeId, NpcId, ObjectId, QuestId, RoomId};
pub use npc::{MerchantConfig, Npc, NpcMood};
pub use object::{ConsumableEffect, EquipSlot, Object, ObjectKind};
pub use quest::{Quest, QuestStage};
pub use room::{Door, Exit, Room};
pub use script::{Action, Comparison, Condition, Node, NodeKind, ScriptGraph};
pub use session::{
    CombatLogEntry, CombatOutcome, CombatPhase, CombatSession, CombatantRef, Session,
    TradeSession, Vitals,
};
pub use state::{
    DelayedScript, DoorState, Equipment, GameClock, GameState, NeedKind, Needs, NpcState,
    ObjectLocation, PlayerState,
};
pub use world::{World, WorldMeta};
