//! Event-driven script graph interpreter and validator for Fabula.
//!
//! Authors wire trigger → condition → action graphs in the visual editor;
//! this crate executes them reactively, one event at a time, and checks
//! them for integrity before play. Runtime problems in authored content
//! are logged and skipped — a malformed branch must never take down a
//! running game.

/// The reactive interpreter.
pub mod interpreter;
/// Ahead-of-play graph validation.
pub mod validate;

pub use interpreter::Interpreter;
pub use validate::{ValidationIssue, validate_world};
