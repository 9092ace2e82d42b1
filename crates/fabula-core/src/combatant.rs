//! The shared combat capability used by both the player and NPCs.

use serde::{Deserialize, Serialize};

/// Combat-relevant statistics.
///
/// Player and NPC entities both reference this capability struct; there is
/// no entity hierarchy. Stats use a d20 frame: a raw score of 10 is average
/// and contributes a modifier of 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    /// Maximum health.
    pub max_health: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Strength score; modifies physical attack rolls and damage.
    pub strength: i32,
    /// Dexterity score; modifies initiative and flee chance.
    pub dexterity: i32,
    /// Intelligence score; modifies magic attack rolls.
    pub intelligence: i32,
    /// Defense value attacks must meet or beat, before equipment bonuses.
    pub base_defense: i32,
    /// Base damage of this combatant's magic attacks, before modifiers.
    pub spell_power: i32,
    /// Mana cost the combatant pays to cast a magic attack.
    pub spell_cost: i32,
    /// Optional reactive ability that blocks incoming magic for a mana cost.
    pub magic_defense: Option<MagicDefense>,
}

/// A reactive ability that cancels an incoming magic hit.
///
/// The defender must be able to afford `mana_cost` when the hit lands;
/// otherwise the ability is skipped and normal defense applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicDefense {
    /// Mana the defender spends each time the ability triggers.
    pub mana_cost: i32,
}

impl Combatant {
    /// A baseline combatant with average scores.
    pub fn average() -> Self {
        Self {
            max_health: 20,
            max_mana: 10,
            strength: 10,
            dexterity: 10,
            intelligence: 10,
            base_defense: 10,
            spell_power: 3,
            spell_cost: 2,
            magic_defense: None,
        }
    }

    /// Modifier derived from a raw score: `(score - 10) / 2`, rounded down.
    pub fn modifier(score: i32) -> i32 {
        (score - 10).div_euclid(2)
    }

    /// Strength modifier.
    pub fn strength_mod(&self) -> i32 {
        Self::modifier(self.strength)
    }

    /// Dexterity modifier.
    pub fn dexterity_mod(&self) -> i32 {
        Self::modifier(self.dexterity)
    }

    /// Intelligence modifier.
    pub fn intelligence_mod(&self) -> i32 {
        Self::modifier(self.intelligence)
    }
}

impl Default for Combatant {
    fn default() -> Self {
        Self::average()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_rounds_down() {
        assert_eq!(Combatant::modifier(10), 0);
        assert_eq!(Combatant::modifier(11), 0);
        assert_eq!(Combatant::modifier(12), 1);
        assert_eq!(Combatant::modifier(15), 2);
        assert_eq!(Combatant::modifier(9), -1);
        assert_eq!(Combatant::modifier(8), -1);
        assert_eq!(Combatant::modifier(7), -2);
    }

    #[test]
    fn average_combatant_has_zero_modifiers() {
        let c = Combatant::average();
        assert_eq!(c.strength_mod(), 0);
        assert_eq!(c.dexterity_mod(), 0);
        assert_eq!(c.intelligence_mod(), 0);
    }
}
