//! Action node payloads: state mutators and side-effect requests.

use serde::{Deserialize, Serialize};

use crate::flags::FlagValue;
use crate::ids::{DoorId, NpcId, ObjectId, QuestId, RoomId};
use crate::npc::NpcMood;
use crate::state::ObjectLocation;

/// What an action node does when executed.
///
/// Actions either mutate `GameState` directly or emit a side-effect
/// request the orchestrator applies; the interpreter performs no I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Emit a narration line.
    ShowMessage {
        /// The text.
        text: String,
    },
    /// Emit an audio cue request.
    PlaySound {
        /// The cue name.
        cue: String,
    },
    /// Set a flag.
    SetFlag {
        /// The flag key.
        key: String,
        /// The value to store.
        value: FlagValue,
    },
    /// Add a delta to a counter (missing counters start at 0).
    AdjustCounter {
        /// The counter key.
        key: String,
        /// The amount to add (may be negative).
        delta: i64,
    },
    /// Put an object into the player's inventory, wherever it was.
    GiveItem {
        /// The object.
        object: ObjectId,
    },
    /// Remove an object from play.
    RemoveItem {
        /// The object.
        object: ObjectId,
    },
    /// Move an object to a new location.
    MoveItem {
        /// The object.
        object: ObjectId,
        /// The destination.
        to: ObjectLocation,
    },
    /// Move an NPC to a room.
    MoveNpc {
        /// The NPC.
        npc: NpcId,
        /// The destination room.
        room: RoomId,
    },
    /// Change an NPC's mood.
    SetNpcMood {
        /// The NPC.
        npc: NpcId,
        /// The new mood.
        mood: NpcMood,
    },
    /// Open a door (also unlocks it).
    OpenDoor {
        /// The door.
        door: DoorId,
    },
    /// Unlock a door without opening it.
    UnlockDoor {
        /// The door.
        door: DoorId,
    },
    /// Move a quest to its active stage.
    StartQuest {
        /// The quest.
        quest: QuestId,
    },
    /// Complete a quest.
    CompleteQuest {
        /// The quest.
        quest: QuestId,
    },
    /// Restore player health.
    Heal {
        /// Hit points restored.
        amount: i32,
    },
    /// Damage the player (never below 1 hp outside combat).
    Damage {
        /// Hit points lost.
        amount: i32,
    },
    /// Grant gold.
    GiveGold {
        /// The amount.
        amount: i64,
    },
    /// Take gold (floors at 0).
    TakeGold {
        /// The amount.
        amount: i64,
    },
    /// Emit a teleport request; the orchestrator runs room-change logic.
    Teleport {
        /// The destination room.
        room: RoomId,
    },
    /// Emit a conversation request.
    StartConversation {
        /// The NPC.
        npc: NpcId,
    },
    /// Raise a custom event back onto the bus (depth-capped cascade).
    RaiseEvent {
        /// The event label.
        label: String,
    },
}
