//! Turn-based combat and trade resolvers for Fabula.
//!
//! Both resolvers are state machines over sessions stored in
//! [`fabula_core::GameState`]: combat drives initiative, d20 attack
//! resolution, and outcome; trade drives transactional buy/sell against a
//! merchant. Neither performs I/O; both return domain events for the
//! orchestrator to route through the script interpreter, raised only
//! after the mutation they describe has completed.

/// The turn-based combat resolver.
pub mod combat;
/// Dice rolling over an injected random source.
pub mod dice;
/// Error types for the resolvers.
pub mod error;
/// The transactional trade resolver.
pub mod trade;

pub use combat::{AttackKind, AttackResolution, CombatReport, PlayerAction, resolve_roll};
pub use dice::{Die, d20, percent};
pub use error::{MechanicsError, MechanicsResult};
