//! Dictionary-driven command parser for Fabula.
//!
//! Turns raw player input into a normalized [`fabula_core::Command`]:
//! tokenize, fold accents per the dictionary's locale rules, match verb
//! and noun aliases (many-to-one), split on prepositions, and resolve
//! pronouns against the last referenced entity. The parser never mutates
//! game state; a single active player session is assumed.

/// Parse failures.
pub mod error;
/// Tokenization of raw input.
pub mod lexer;
/// The parser itself.
pub mod parse;

pub use error::{ParseFailure, ParseResult};
pub use lexer::tokenize;
pub use parse::{is_visible, parse};
