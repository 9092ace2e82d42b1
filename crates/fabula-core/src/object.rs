//! Objects: items, weapons, armor, consumables, containers.

use serde::{Deserialize, Serialize};

use crate::ids::ObjectId;
use crate::state::NeedKind;

/// An authored object definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    /// The object's id.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Description shown by `examine`.
    pub description: String,
    /// Surface forms the parser accepts for this object ("key", "llave").
    pub aliases: Vec<String>,
    /// Whether the object can be picked up.
    #[serde(default = "default_true")]
    pub portable: bool,
    /// Base price in gold for trade.
    #[serde(default)]
    pub price: i64,
    /// What kind of object this is.
    #[serde(default)]
    pub kind: ObjectKind,
}

fn default_true() -> bool {
    true
}

/// Typed payload deciding how an object behaves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    /// An ordinary object with no special behavior.
    #[default]
    Plain,
    /// A weapon that can be equipped.
    Weapon {
        /// Base damage dealt on a hit.
        damage: i32,
    },
    /// Armor that can be equipped.
    Armor {
        /// Defense bonus while worn.
        defense: i32,
    },
    /// A shield that can be equipped.
    Shield {
        /// Defense bonus while held.
        defense: i32,
    },
    /// A consumable that can be eaten, drunk, or used in combat.
    Consumable {
        /// The effect applied when consumed.
        effect: ConsumableEffect,
    },
    /// A light source that can be lit and extinguished.
    LightSource,
    /// A key for one or more doors.
    Key,
    /// A container holding other objects.
    Container,
}

/// What consuming an object does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableEffect {
    /// Restore health.
    Heal(i32),
    /// Restore mana.
    RestoreMana(i32),
    /// Satisfy a need by the given fraction (0.0..=1.0).
    Satisfy {
        /// Which need is satisfied.
        need: NeedKind,
        /// How much of the bar is restored.
        amount: f32,
    },
}

/// Equipment slot an object can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// Main-hand weapon.
    Weapon,
    /// Worn armor.
    Armor,
    /// Off-hand shield.
    Shield,
}

impl Object {
    /// Create a plain, portable object. The display name doubles as an alias.
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            aliases: vec![name.to_lowercase()],
            name,
            description: String::new(),
            portable: true,
            price: 0,
            kind: ObjectKind::Plain,
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

    /// Set the base trade price.
    pub fn with_price(mut self, price: i64) -> Self {
        self.price = price;
        self
    }

    /// Set the object kind.
    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the object as fixed in place.
    pub fn fixed(mut self) -> Self {
        self.portable = false;
        self
    }

    /// The slot this object equips into, if it is equippable.
    pub fn equip_slot(&self) -> Option<EquipSlot> {
        match self.kind {
            ObjectKind::Weapon { .. } => Some(EquipSlot::Weapon),
            ObjectKind::Armor { .. } => Some(EquipSlot::Armor),
            ObjectKind::Shield { .. } => Some(EquipSlot::Shield),
            _ => None,
        }
    }

    /// Defense bonus this object grants while equipped.
    pub fn defense_bonus(&self) -> i32 {
        match self.kind {
            ObjectKind::Armor { defense } | ObjectKind::Shield { defense } => defense,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_becomes_default_alias() {
        let obj = Object::new("torch", "Torch").with_alias("antorcha");
        assert_eq!(obj.aliases, vec!["torch".to_string(), "antorcha".to_string()]);
    }

    #[test]
    fn equip_slots() {
        let sword = Object::new("sword", "sword").with_kind(ObjectKind::Weapon { damage: 4 });
        let mail = Object::new("mail", "chain mail").with_kind(ObjectKind::Armor { defense: 2 });
        let apple = Object::new("apple", "apple");

        assert_eq!(sword.equip_slot(), Some(EquipSlot::Weapon));
        assert_eq!(mail.equip_slot(), Some(EquipSlot::Armor));
        assert_eq!(mail.defense_bonus(), 2);
        assert_eq!(apple.equip_slot(), None);
    }
}
