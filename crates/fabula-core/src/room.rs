//! Rooms, exits, and doors.

use serde::{Deserialize, Serialize};

use crate::dictionary::Direction;
use crate::ids::{DoorId, ObjectId, RoomId};

/// A room in the authored world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// The room's id.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Description shown by `look`.
    pub description: String,
    /// Exits leading out of the room.
    pub exits: Vec<Exit>,
    /// Whether the room is dark without an active light source.
    #[serde(default)]
    pub dark: bool,
}

impl Room {
    /// Create a room with no exits.
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            exits: Vec::new(),
            dark: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the room as dark.
    pub fn with_darkness(mut self) -> Self {
        self.dark = true;
        self
    }

    /// Add an exit.
    pub fn with_exit(mut self, exit: Exit) -> Self {
        self.exits.push(exit);
        self
    }

    /// Find the exit in a given direction, if any.
    pub fn exit(&self, direction: Direction) -> Option<&Exit> {
        self.exits.iter().find(|e| e.direction == direction)
    }
}

/// A one-way connection from one room to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exit {
    /// Direction of travel.
    pub direction: Direction,
    /// Destination room.
    pub to: RoomId,
    /// Door blocking this exit, if any.
    #[serde(default)]
    pub door: Option<DoorId>,
}

impl Exit {
    /// Create an open exit.
    pub fn new(direction: Direction, to: impl Into<RoomId>) -> Self {
        Self {
            direction,
            to: to.into(),
            door: None,
        }
    }

    /// Place a door on the exit.
    pub fn with_door(mut self, door: impl Into<DoorId>) -> Self {
        self.door = Some(door.into());
        self
    }
}

/// Authored definition of a door.
///
/// The open/locked runtime state lives in `GameState`; this is the door's
/// identity and initial configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    /// The door's id.
    pub id: DoorId,
    /// Display name ("oak door", "iron gate").
    pub name: String,
    /// Whether the door starts open.
    #[serde(default)]
    pub open: bool,
    /// Whether the door starts locked.
    #[serde(default)]
    pub locked: bool,
    /// The key object that locks and unlocks it, if any.
    #[serde(default)]
    pub key: Option<ObjectId>,
}

impl Door {
    /// Create a closed, unlocked door.
    pub fn new(id: impl Into<DoorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            open: false,
            locked: false,
            key: None,
        }
    }

    /// Start the door locked, openable with the given key.
    pub fn locked_with_key(mut self, key: impl Into<ObjectId>) -> Self {
        self.locked = true;
        self.key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_exit_lookup() {
        let room = Room::new("hall", "the Great Hall")
            .with_exit(Exit::new(Direction::North, "tower"))
            .with_exit(Exit::new(Direction::East, "yard").with_door("gate"));

        assert_eq!(room.exit(Direction::North).unwrap().to, RoomId::new("tower"));
        assert_eq!(
            room.exit(Direction::East).unwrap().door,
            Some(DoorId::new("gate"))
        );
        assert!(room.exit(Direction::South).is_none());
    }

    #[test]
    fn locked_door_setup() {
        let door = Door::new("gate", "iron gate").locked_with_key("rusty-key");
        assert!(door.locked);
        assert!(!door.open);
        assert_eq!(door.key, Some(ObjectId::new("rusty-key")));
    }
}
