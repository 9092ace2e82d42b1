//! Condition node payloads: pure predicates over the game state.

use serde::{Deserialize, Serialize};

use crate::flags::FlagValue;
use crate::ids::{DoorId, NpcId, ObjectId, QuestId, RoomId};
use crate::quest::QuestStage;

/// A predicate evaluated against world and game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The player carries the object.
    HasItem {
        /// The object to check for.
        object: ObjectId,
    },
    /// The flag exists and is truthy.
    FlagSet {
        /// The flag key.
        key: String,
    },
    /// The flag equals a value; a missing flag never matches.
    FlagEquals {
        /// The flag key.
        key: String,
        /// The expected value.
        value: FlagValue,
    },
    /// Compare a counter against a constant; missing counters read as 0.
    CounterCompare {
        /// The counter key.
        key: String,
        /// The comparison operator.
        op: Comparison,
        /// The right-hand side.
        value: i64,
    },
    /// The player is in the room.
    PlayerIn {
        /// The room.
        room: RoomId,
    },
    /// The NPC is alive.
    NpcAlive {
        /// The NPC.
        npc: NpcId,
    },
    /// The NPC is currently in the room.
    NpcIn {
        /// The NPC.
        npc: NpcId,
        /// The room.
        room: RoomId,
    },
    /// The door is open.
    DoorOpen {
        /// The door.
        door: DoorId,
    },
    /// The quest is at the given stage.
    QuestAt {
        /// The quest.
        quest: QuestId,
        /// The expected stage.
        stage: QuestStage,
    },
    /// Succeeds with the given percent probability (uses the injected
    /// random source, so outcomes reproduce under a fixed seed).
    Chance {
        /// Success chance, 0..=100.
        percent: u32,
    },
    /// Logical NOT.
    Not(Box<Condition>),
    /// Logical AND over all inner conditions.
    All(Vec<Condition>),
    /// Logical OR over the inner conditions.
    Any(Vec<Condition>),
}

/// Comparison operators for counter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl Comparison {
    /// Apply the operator.
    pub fn matches(self, left: i64, right: i64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_operators() {
        assert!(Comparison::Eq.matches(3, 3));
        assert!(Comparison::Ne.matches(3, 4));
        assert!(Comparison::Lt.matches(2, 3));
        assert!(Comparison::Le.matches(3, 3));
        assert!(Comparison::Gt.matches(4, 3));
        assert!(Comparison::Ge.matches(3, 3));
        assert!(!Comparison::Gt.matches(3, 3));
    }
}
