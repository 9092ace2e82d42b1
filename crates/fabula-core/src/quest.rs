//! Quests and quest progress.

use serde::{Deserialize, Serialize};

use crate::ids::QuestId;

/// An authored quest definition.
///
/// Progress is driven entirely by script actions; the quest itself is just
/// an id, a name, and log text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    /// The quest's id.
    pub id: QuestId,
    /// Display name for the quest log.
    pub name: String,
    /// Log entry shown while the quest is active.
    pub description: String,
}

impl Quest {
    /// Create a quest.
    pub fn new(id: impl Into<QuestId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    /// Set the log text.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Progress of one quest within a playthrough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStage {
    /// The quest has not been offered or started.
    #[default]
    NotStarted,
    /// The quest is underway.
    Active,
    /// The quest has been finished.
    Completed,
}
