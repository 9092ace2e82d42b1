//! Side-effect requests surfaced to the host UI/audio layer.

use serde::{Deserialize, Serialize};

use crate::ids::{NpcId, RoomId};

/// An instruction for the host to perform a non-simulation action.
///
/// The core never calls UI or audio APIs directly; it emits these values
/// and the host applies them. `Teleport` is the one request the
/// orchestrator consumes itself, because moving the player must run the
/// full room-change logic (exit events, session auto-close, enter events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SideEffectRequest {
    /// Print a narration line.
    ShowMessage {
        /// The text to show.
        text: String,
    },
    /// Play an audio cue by name.
    PlaySound {
        /// The author-chosen cue name.
        cue: String,
    },
    /// Open the conversation UI with an NPC.
    StartConversation {
        /// The NPC to converse with.
        npc: NpcId,
    },
    /// Move the player to a room (applied by the orchestrator).
    Teleport {
        /// The destination room.
        room: RoomId,
    },
    /// Refresh the host's map panel.
    UpdateMap,
    /// Ask the host to save the game.
    RequestSave,
    /// Ask the host to load a save.
    RequestLoad,
}
