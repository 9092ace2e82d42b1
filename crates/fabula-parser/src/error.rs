//! Parse failures.

use fabula_core::Verb;

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseFailure>;

/// Why a raw input line could not become a command.
///
/// Parse failures are recovered locally: the orchestrator surfaces them as
/// a narration line and the game state is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseFailure {
    /// No token resolved to a known verb.
    #[error("I don't understand \"{input}\".")]
    UnknownVerb {
        /// The offending input.
        input: String,
        /// A near-miss verb alias, if one scored close enough.
        suggestion: Option<String>,
    },

    /// An object phrase matched two or more entities in scope. The
    /// orchestrator decides the disambiguation UX.
    #[error("Which one: {}?", candidates.join(", "))]
    Ambiguous {
        /// The ambiguous phrase as typed.
        phrase: String,
        /// Display names of the matching entities.
        candidates: Vec<String>,
    },

    /// The verb needs an object and none was given (or a pronoun had no
    /// antecedent).
    #[error("What do you want to {verb}?")]
    MissingObject {
        /// The verb awaiting an object.
        verb: Verb,
    },
}
