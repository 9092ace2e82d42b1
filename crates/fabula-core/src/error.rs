//! Error types used throughout the crate.

use crate::ids::{DoorId, NpcId, ObjectId, QuestId, RoomId};

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when constructing or querying a world.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested room id does not exist in the world.
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// The requested object id does not exist in the world.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The requested NPC id does not exist in the world.
    #[error("npc not found: {0}")]
    NpcNotFound(NpcId),

    /// The requested door id does not exist in the world.
    #[error("door not found: {0}")]
    DoorNotFound(DoorId),

    /// The requested quest id does not exist in the world.
    #[error("quest not found: {0}")]
    QuestNotFound(QuestId),

    /// An entity with the same id already exists.
    #[error("duplicate id: \"{0}\"")]
    DuplicateId(String),

    /// An exit references a room that was never added.
    #[error("exit from {from} leads to unknown room {to}")]
    DanglingExit {
        /// The room the exit leaves from.
        from: RoomId,
        /// The missing destination room.
        to: RoomId,
    },
}
