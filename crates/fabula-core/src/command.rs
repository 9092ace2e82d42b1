//! The normalized command produced by the parser.

use serde::{Deserialize, Serialize};

use crate::dictionary::{Direction, NounRef, Preposition, Verb};

/// A fully parsed player command: verb, direct object, preposition, and
/// indirect object. Ephemeral — one per player input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The canonical verb.
    pub verb: Verb,
    /// Direction, for movement commands.
    pub direction: Option<Direction>,
    /// The direct object phrase, if any.
    pub direct: Option<NounPhrase>,
    /// The preposition splitting direct from indirect, if any.
    pub preposition: Option<Preposition>,
    /// The indirect object phrase, if any.
    pub indirect: Option<NounPhrase>,
}

impl Command {
    /// A bare command with no objects.
    pub fn bare(verb: Verb) -> Self {
        Self {
            verb,
            direction: None,
            direct: None,
            preposition: None,
            indirect: None,
        }
    }

    /// A movement command.
    pub fn movement(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            ..Self::bare(Verb::Go)
        }
    }

    /// The resolved direct-object reference, if the phrase resolved.
    pub fn direct_ref(&self) -> Option<&NounRef> {
        self.direct.as_ref().and_then(NounPhrase::resolved)
    }

    /// The resolved indirect-object reference, if the phrase resolved.
    pub fn indirect_ref(&self) -> Option<&NounRef> {
        self.indirect.as_ref().and_then(NounPhrase::resolved)
    }
}

/// An object phrase with its resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NounPhrase {
    /// The raw (normalized) phrase text as typed.
    pub text: String,
    /// What the phrase resolved to.
    pub resolution: Resolution,
}

impl NounPhrase {
    /// A phrase resolved to a known entity.
    pub fn resolved(&self) -> Option<&NounRef> {
        match &self.resolution {
            Resolution::Resolved(r) => Some(r),
            Resolution::Literal => None,
        }
    }
}

/// Outcome of resolving an object phrase against the dictionary.
///
/// Phrases naming entities not yet in the dictionary (proper nouns from
/// authored content) stay literal; downstream handlers decide what that
/// means for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// The phrase names exactly one entity in scope.
    Resolved(NounRef),
    /// The phrase did not match any dictionary entry.
    Literal,
}
