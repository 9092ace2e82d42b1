//! Error types for the mechanics resolvers.

use fabula_core::{NpcId, ObjectId};

/// Convenience result type for mechanics operations.
pub type MechanicsResult<T> = Result<T, MechanicsError>;

/// Errors raised by the combat and trade resolvers.
///
/// Every rejection leaves the game state unchanged; the orchestrator
/// surfaces these as narration lines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MechanicsError {
    /// Combat was started while another combat is active.
    #[error("a fight is already underway")]
    CombatAlreadyActive,

    /// A combat action arrived with no combat running.
    #[error("there is no fight to resolve")]
    NotInCombat,

    /// An action was resolved for a combatant whose turn it is not.
    #[error("it is not that combatant's turn")]
    OutOfTurn,

    /// A trade was opened while combat is active.
    #[error("no time to haggle in a fight")]
    TradeDuringCombat,

    /// A buy or sell arrived with no shop session open.
    #[error("no shop is open")]
    NoTradeOpen,

    /// The target NPC is not configured as a merchant.
    #[error("{0} is not a merchant")]
    NotAMerchant(NpcId),

    /// The target NPC cannot fight.
    #[error("{0} cannot fight")]
    NotACombatant(NpcId),

    /// The NPC does not exist in this world.
    #[error("unknown npc: {0}")]
    UnknownNpc(NpcId),

    /// The NPC is dead.
    #[error("{0} is dead")]
    NpcDead(NpcId),

    /// The buyer cannot afford the transaction.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// The price asked.
        needed: i64,
        /// The gold available.
        available: i64,
    },

    /// The caster cannot pay a mana cost.
    #[error("insufficient mana: need {needed}, have {available}")]
    InsufficientMana {
        /// The mana required.
        needed: i32,
        /// The mana available.
        available: i32,
    },

    /// The object is not offered by the merchant.
    #[error("{0} is not for sale")]
    NotInStock(ObjectId),

    /// The object is not in the player's inventory.
    #[error("{0} is not carried")]
    NotCarried(ObjectId),

    /// The object cannot be consumed.
    #[error("{0} is not consumable")]
    NotConsumable(ObjectId),
}
