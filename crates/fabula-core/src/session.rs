//! Ephemeral sub-state machines nested inside `GameState`.
//!
//! A combat or trade session exists only while active and is destroyed on
//! resolution. Both serialize with the rest of the state so a mid-session
//! save resumes exactly where it left off.

use serde::{Deserialize, Serialize};

use crate::ids::{NpcId, ObjectId};

/// The active session, if any. Combat and trade are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "session", rename_all = "snake_case")]
pub enum Session {
    /// A combat encounter.
    Combat(CombatSession),
    /// A shop session.
    Trade(TradeSession),
}

/// A participant slot in combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatantRef {
    /// The player.
    Player,
    /// An NPC.
    Npc(NpcId),
}

/// Per-combatant health and mana tracked for the duration of a combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Current health.
    pub health: i32,
    /// Current mana.
    pub mana: i32,
    /// Whether the combatant is defending until its next turn.
    #[serde(default)]
    pub defending: bool,
}

impl Vitals {
    /// Create vitals at the given levels.
    pub fn new(health: i32, mana: i32) -> Self {
        Self {
            health,
            mana,
            defending: false,
        }
    }

    /// Whether the combatant is out of the fight.
    pub fn is_down(&self) -> bool {
        self.health <= 0
    }
}

/// Where the combat state machine currently stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    /// Waiting for the player's action.
    PlayerTurn,
    /// An NPC is acting.
    NpcTurn,
    /// The combat is over.
    Ended(CombatOutcome),
}

/// How a combat ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    /// All opposing NPCs were defeated.
    Victory,
    /// The player was defeated.
    Defeat,
    /// The player escaped.
    Fled,
}

/// A combat encounter in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSession {
    /// Combatants in initiative order.
    pub order: Vec<CombatantRef>,
    /// Vitals parallel to `order`.
    pub vitals: Vec<Vitals>,
    /// Index into `order` of the combatant whose turn it is.
    pub turn: usize,
    /// Current round number (1-based).
    pub round: u32,
    /// Where the state machine stands.
    pub phase: CombatPhase,
    /// Log of everything that happened, for narration and post-mortems.
    pub log: Vec<CombatLogEntry>,
}

impl CombatSession {
    /// The combatant whose turn it is.
    pub fn current(&self) -> &CombatantRef {
        &self.order[self.turn]
    }

    /// Index of the player in the initiative order.
    pub fn player_index(&self) -> usize {
        self.order
            .iter()
            .position(|c| matches!(c, CombatantRef::Player))
            .unwrap_or(0)
    }

    /// Index of an NPC in the initiative order, if present.
    pub fn npc_index(&self, npc: &NpcId) -> Option<usize> {
        self.order
            .iter()
            .position(|c| matches!(c, CombatantRef::Npc(id) if id == npc))
    }

    /// Indices of NPCs still standing.
    pub fn standing_npcs(&self) -> Vec<usize> {
        self.order
            .iter()
            .enumerate()
            .filter(|(i, c)| matches!(c, CombatantRef::Npc(_)) && !self.vitals[*i].is_down())
            .map(|(i, _)| i)
            .collect()
    }

    /// Advance the turn index past downed combatants. Returns true if a
    /// new round started.
    pub fn advance_turn(&mut self) -> bool {
        let mut new_round = false;
        for _ in 0..self.order.len() {
            self.turn += 1;
            if self.turn >= self.order.len() {
                self.turn = 0;
                self.round += 1;
                new_round = true;
            }
            if !self.vitals[self.turn].is_down() {
                break;
            }
        }
        // The new actor's defend stance lapses at the start of its turn.
        self.vitals[self.turn].defending = false;
        new_round
    }

    /// Record a log entry.
    pub fn log_entry(&mut self, entry: CombatLogEntry) {
        self.log.push(entry);
    }
}

/// One recorded combat occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum CombatLogEntry {
    /// An initiative roll.
    Initiative {
        /// Who rolled.
        who: CombatantRef,
        /// The raw d20 roll.
        roll: u32,
        /// Roll plus dexterity modifier.
        total: i32,
    },
    /// An attack resolution.
    Attack {
        /// The attacker.
        attacker: CombatantRef,
        /// The defender.
        defender: CombatantRef,
        /// Whether the attack was magical.
        magic: bool,
        /// The raw d20 roll.
        roll: u32,
        /// Roll plus the relevant modifier.
        total: i32,
        /// The defense value the roll was compared against.
        defense: i32,
        /// Whether the attack landed.
        hit: bool,
        /// Natural 20.
        critical: bool,
        /// Natural 1.
        fumble: bool,
        /// Whether a magic-defense ability cancelled the hit.
        blocked: bool,
        /// Damage dealt.
        damage: i32,
    },
    /// A defensive stance.
    Defend {
        /// Who defended.
        who: CombatantRef,
    },
    /// A flee attempt.
    FleeAttempt {
        /// The success chance that was rolled against.
        chance: u32,
        /// Whether the escape succeeded.
        success: bool,
    },
    /// A consumable used mid-combat.
    ItemUsed {
        /// Who used it.
        who: CombatantRef,
        /// The object consumed.
        object: ObjectId,
    },
}

/// A shop session in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSession {
    /// The merchant.
    pub npc: NpcId,
    /// Snapshot of the merchant's stock at open.
    pub stock: Vec<ObjectId>,
    /// Multiplier for prices when the merchant buys from the player.
    pub buy_multiplier: f64,
    /// Multiplier for prices when the merchant sells to the player.
    pub sell_multiplier: f64,
    /// The merchant's gold for this session; `None` means unlimited.
    pub merchant_gold: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(order: Vec<CombatantRef>) -> CombatSession {
        let vitals = order.iter().map(|_| Vitals::new(10, 5)).collect();
        CombatSession {
            order,
            vitals,
            turn: 0,
            round: 1,
            phase: CombatPhase::PlayerTurn,
            log: Vec::new(),
        }
    }

    #[test]
    fn advance_skips_downed_combatants() {
        let mut s = session_with(vec![
            CombatantRef::Player,
            CombatantRef::Npc(NpcId::new("a")),
            CombatantRef::Npc(NpcId::new("b")),
        ]);
        s.vitals[1].health = 0;

        assert!(!s.advance_turn());
        assert_eq!(s.turn, 2);
        assert!(s.advance_turn());
        assert_eq!(s.turn, 0);
        assert_eq!(s.round, 2);
    }

    #[test]
    fn advance_clears_defend_stance() {
        let mut s = session_with(vec![CombatantRef::Player, CombatantRef::Npc(NpcId::new("a"))]);
        s.vitals[1].defending = true;
        s.advance_turn();
        assert!(!s.vitals[1].defending);
    }

    #[test]
    fn standing_npcs_excludes_downed() {
        let mut s = session_with(vec![
            CombatantRef::Player,
            CombatantRef::Npc(NpcId::new("a")),
            CombatantRef::Npc(NpcId::new("b")),
        ]);
        s.vitals[2].health = 0;
        assert_eq!(s.standing_npcs(), vec![1]);
    }
}
