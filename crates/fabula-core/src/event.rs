//! Domain events raised by the orchestrator and resolvers.
//!
//! Every event is dispatched synchronously to the script interpreter;
//! trigger nodes subscribe by kind and scope.

use serde::{Deserialize, Serialize};

use crate::ids::{DoorId, NpcId, ObjectId, QuestId, RoomId};
use crate::state::NeedKind;

/// Something that happened in the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// The player entered a room.
    RoomEntered {
        /// The room entered.
        room: RoomId,
    },
    /// The player left a room.
    RoomExited {
        /// The room left.
        room: RoomId,
    },
    /// The player picked up an object.
    ItemTaken {
        /// The object taken.
        object: ObjectId,
    },
    /// The player dropped an object.
    ItemDropped {
        /// The object dropped.
        object: ObjectId,
    },
    /// The player used an object, optionally on a target.
    ItemUsed {
        /// The object used.
        object: ObjectId,
        /// The target object, if any.
        target: Option<ObjectId>,
    },
    /// A door was opened.
    DoorOpened {
        /// The door.
        door: DoorId,
    },
    /// A door was unlocked.
    DoorUnlocked {
        /// The door.
        door: DoorId,
    },
    /// The player talked to an NPC.
    Conversation {
        /// The NPC spoken to.
        npc: NpcId,
    },
    /// An NPC died.
    NpcDied {
        /// The NPC that died.
        npc: NpcId,
    },
    /// Combat began.
    CombatStarted {
        /// The NPC the player attacked or was attacked by.
        npc: NpcId,
    },
    /// The player won a combat.
    CombatWon {
        /// The last NPC defeated.
        npc: NpcId,
    },
    /// The player was defeated in combat.
    CombatLost,
    /// The player fled combat.
    CombatFled {
        /// The NPC fled from.
        npc: NpcId,
    },
    /// A shop session opened.
    ShopOpened {
        /// The merchant.
        npc: NpcId,
    },
    /// A shop session closed.
    ShopClosed {
        /// The merchant.
        npc: NpcId,
    },
    /// The player bought an object.
    ItemBought {
        /// The merchant.
        npc: NpcId,
        /// The object bought.
        object: ObjectId,
    },
    /// The player sold an object.
    ItemSold {
        /// The merchant.
        npc: NpcId,
        /// The object sold.
        object: ObjectId,
    },
    /// A buy or sell attempt failed (for "attempted but failed" hooks).
    TradeFailed {
        /// The merchant.
        npc: NpcId,
        /// The object involved.
        object: ObjectId,
    },
    /// A quest became active.
    QuestStarted {
        /// The quest.
        quest: QuestId,
    },
    /// A quest was completed.
    QuestCompleted {
        /// The quest.
        quest: QuestId,
    },
    /// A need dropped below the critical threshold.
    NeedCritical {
        /// The need.
        need: NeedKind,
    },
    /// A game turn elapsed.
    TurnElapsed {
        /// The tick that just completed.
        tick: u64,
    },
    /// An author-defined event, raised by scripts or by `say`.
    Custom {
        /// The author-chosen label.
        label: String,
    },
}

impl GameEvent {
    /// The kind used for trigger matching.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::RoomEntered { .. } => EventKind::RoomEnter,
            Self::RoomExited { .. } => EventKind::RoomExit,
            Self::ItemTaken { .. } => EventKind::ItemTaken,
            Self::ItemDropped { .. } => EventKind::ItemDropped,
            Self::ItemUsed { .. } => EventKind::ItemUsed,
            Self::DoorOpened { .. } => EventKind::DoorOpened,
            Self::DoorUnlocked { .. } => EventKind::DoorUnlocked,
            Self::Conversation { .. } => EventKind::Conversation,
            Self::NpcDied { .. } => EventKind::NpcDeath,
            Self::CombatStarted { .. } => EventKind::CombatStart,
            Self::CombatWon { .. } => EventKind::CombatVictory,
            Self::CombatLost => EventKind::CombatDefeat,
            Self::CombatFled { .. } => EventKind::CombatFlee,
            Self::ShopOpened { .. } => EventKind::ShopOpen,
            Self::ShopClosed { .. } => EventKind::ShopClose,
            Self::ItemBought { .. } => EventKind::ItemBought,
            Self::ItemSold { .. } => EventKind::ItemSold,
            Self::TradeFailed { .. } => EventKind::TradeFailed,
            Self::QuestStarted { .. } => EventKind::QuestStarted,
            Self::QuestCompleted { .. } => EventKind::QuestCompleted,
            Self::NeedCritical { .. } => EventKind::NeedCritical,
            Self::TurnElapsed { .. } => EventKind::TurnElapsed,
            Self::Custom { label } => EventKind::Custom(label.clone()),
        }
    }

    /// The room this event is about, if any.
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            Self::RoomEntered { room } | Self::RoomExited { room } => Some(room),
            _ => None,
        }
    }

    /// The NPC this event is about, if any.
    pub fn npc(&self) -> Option<&NpcId> {
        match self {
            Self::Conversation { npc }
            | Self::NpcDied { npc }
            | Self::CombatStarted { npc }
            | Self::CombatWon { npc }
            | Self::CombatFled { npc }
            | Self::ShopOpened { npc }
            | Self::ShopClosed { npc }
            | Self::ItemBought { npc, .. }
            | Self::ItemSold { npc, .. }
            | Self::TradeFailed { npc, .. } => Some(npc),
            _ => None,
        }
    }

    /// The object this event is about, if any.
    pub fn object(&self) -> Option<&ObjectId> {
        match self {
            Self::ItemTaken { object }
            | Self::ItemDropped { object }
            | Self::ItemUsed { object, .. }
            | Self::ItemBought { object, .. }
            | Self::ItemSold { object, .. }
            | Self::TradeFailed { object, .. } => Some(object),
            _ => None,
        }
    }
}

/// The event kinds trigger nodes can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The player entered a room.
    RoomEnter,
    /// The player left a room.
    RoomExit,
    /// An object was taken.
    ItemTaken,
    /// An object was dropped.
    ItemDropped,
    /// An object was used.
    ItemUsed,
    /// A door was opened.
    DoorOpened,
    /// A door was unlocked.
    DoorUnlocked,
    /// The player talked to an NPC.
    Conversation,
    /// An NPC died.
    NpcDeath,
    /// Combat started.
    CombatStart,
    /// Combat ended in victory.
    CombatVictory,
    /// Combat ended in defeat.
    CombatDefeat,
    /// Combat ended in flight.
    CombatFlee,
    /// A shop opened.
    ShopOpen,
    /// A shop closed.
    ShopClose,
    /// An object was bought.
    ItemBought,
    /// An object was sold.
    ItemSold,
    /// A trade attempt failed.
    TradeFailed,
    /// A quest started.
    QuestStarted,
    /// A quest completed.
    QuestCompleted,
    /// A need became critical.
    NeedCritical,
    /// A turn elapsed.
    TurnElapsed,
    /// An author-defined event with a matching label.
    Custom(String),
}

/// Where a trigger listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// Fires anywhere.
    Global,
    /// Fires only for its declared room: the event's room payload must
    /// match, or — for events with no room payload — the player must be in
    /// that room.
    Room(RoomId),
    /// Fires only when the event is about this NPC.
    Npc(NpcId),
    /// Fires only when the event is about this object.
    Object(ObjectId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping() {
        let e = GameEvent::RoomEntered {
            room: RoomId::new("cave"),
        };
        assert_eq!(e.kind(), EventKind::RoomEnter);

        let e = GameEvent::Custom {
            label: "xyzzy".to_string(),
        };
        assert_eq!(e.kind(), EventKind::Custom("xyzzy".to_string()));
    }

    #[test]
    fn payload_accessors() {
        let e = GameEvent::ItemBought {
            npc: NpcId::new("smith"),
            object: ObjectId::new("sword"),
        };
        assert_eq!(e.npc(), Some(&NpcId::new("smith")));
        assert_eq!(e.object(), Some(&ObjectId::new("sword")));
        assert_eq!(e.room(), None);
    }
}
