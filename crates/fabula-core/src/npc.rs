//! Non-player characters.

use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::ids::{NpcId, ObjectId, RoomId};

/// An authored NPC definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    /// The NPC's id.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Description shown by `examine`.
    pub description: String,
    /// Surface forms the parser accepts for this NPC.
    pub aliases: Vec<String>,
    /// The room the NPC starts in.
    pub room: RoomId,
    /// Initial disposition toward the player.
    #[serde(default)]
    pub mood: NpcMood,
    /// Combat capability; NPCs without one cannot fight or be attacked.
    #[serde(default)]
    pub combatant: Option<Combatant>,
    /// Merchant configuration; present only for shopkeepers.
    #[serde(default)]
    pub merchant: Option<MerchantConfig>,
    /// Objects the NPC carries (lootable on death).
    #[serde(default)]
    pub inventory: Vec<ObjectId>,
    /// Rooms the NPC walks between, one step per turn, cycling.
    #[serde(default)]
    pub patrol: Vec<RoomId>,
}

/// Disposition of an NPC toward the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcMood {
    /// Indifferent; will not join fights.
    #[default]
    Neutral,
    /// Friendly; will not join fights.
    Friendly,
    /// Hostile; joins combat started in its room.
    Hostile,
}

/// Shop configuration for a merchant NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantConfig {
    /// Multiplier applied to base price when the merchant buys from the
    /// player.
    pub buy_multiplier: f64,
    /// Multiplier applied to base price when the merchant sells to the
    /// player.
    pub sell_multiplier: f64,
    /// The merchant's gold; `None` means unlimited.
    #[serde(default)]
    pub gold: Option<i64>,
    /// Objects offered for sale.
    #[serde(default)]
    pub stock: Vec<ObjectId>,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            buy_multiplier: 0.5,
            sell_multiplier: 1.0,
            gold: None,
            stock: Vec::new(),
        }
    }
}

impl Npc {
    /// Create an NPC in the given room. The display name doubles as an alias.
    pub fn new(id: impl Into<NpcId>, name: impl Into<String>, room: impl Into<RoomId>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            aliases: vec![name.to_lowercase()],
            name,
            description: String::new(),
            room: room.into(),
            mood: NpcMood::Neutral,
            combatant: None,
            merchant: None,
            inventory: Vec::new(),
            patrol: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an extra parser alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().to_lowercase());
        self
    }

    /// Give the NPC combat capability.
    pub fn with_combatant(mut self, combatant: Combatant) -> Self {
        self.combatant = Some(combatant);
        self
    }

    /// Make the NPC a merchant.
    pub fn with_merchant(mut self, merchant: MerchantConfig) -> Self {
        self.merchant = Some(merchant);
        self
    }

    /// Set the initial mood.
    pub fn with_mood(mut self, mood: NpcMood) -> Self {
        self.mood = mood;
        self
    }

    /// Give the NPC starting inventory.
    pub fn carrying(mut self, objects: Vec<ObjectId>) -> Self {
        self.inventory = objects;
        self
    }

    /// Set a patrol route.
    pub fn with_patrol(mut self, rooms: Vec<RoomId>) -> Self {
        self.patrol = rooms;
        self
    }
}
