//! Typed identifiers for authored content.
//!
//! Every cross-reference in the world model is an id looked up in a table,
//! never an ownership edge. Ids are author-assigned strings so that script
//! graphs and world files stay human-readable.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an id from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a room.
    RoomId
);
string_id!(
    /// Identifier of an object.
    ObjectId
);
string_id!(
    /// Identifier of a non-player character.
    NpcId
);
string_id!(
    /// Identifier of a door between two rooms.
    DoorId
);
string_id!(
    /// Identifier of a quest.
    QuestId
);
string_id!(
    /// Identifier of a script graph.
    GraphId
);
string_id!(
    /// Identifier of a node within a script graph.
    NodeId
);
