//! The transactional trade resolver.
//!
//! A shop session snapshots the merchant's stock, multipliers, and purse.
//! Buy and sell move gold and goods all-or-nothing: every check happens
//! before the first mutation, so a rejected transaction leaves the
//! pre-transaction state intact. Events fire only after the mutation
//! completes — scripts always observe post-transaction state.

use fabula_core::state::ObjectLocation;
use fabula_core::{
    GameEvent, GameState, NpcId, Object, ObjectId, Session, TradeSession, World,
};

use crate::error::{MechanicsError, MechanicsResult};

/// Open a shop session with a merchant NPC.
///
/// Rejected while combat is active (trade and combat are mutually
/// exclusive) and for NPCs without a merchant configuration. An already
/// open session with another merchant is closed first.
pub fn open_trade(
    world: &World,
    state: &mut GameState,
    npc: &NpcId,
) -> MechanicsResult<Vec<GameEvent>> {
    if matches!(state.session, Some(Session::Combat(_))) {
        return Err(MechanicsError::TradeDuringCombat);
    }
    let merchant = world
        .npc(npc)
        .ok_or_else(|| MechanicsError::UnknownNpc(npc.clone()))?;
    let npc_state = state
        .npc_state(npc)
        .ok_or_else(|| MechanicsError::UnknownNpc(npc.clone()))?;
    if !npc_state.alive {
        return Err(MechanicsError::NpcDead(npc.clone()));
    }
    let Some(config) = &merchant.merchant else {
        return Err(MechanicsError::NotAMerchant(npc.clone()));
    };

    let mut events = Vec::new();
    if matches!(state.session, Some(Session::Trade(_))) {
        events.extend(close_trade(state));
    }

    // The purse persists across sessions; fall back to the authored value.
    let persisted_gold = state.npc_state(npc).and_then(|ns| ns.gold);
    let merchant_gold = persisted_gold.or(config.gold);

    state.session = Some(Session::Trade(TradeSession {
        npc: npc.clone(),
        stock: config.stock.clone(),
        buy_multiplier: config.buy_multiplier,
        sell_multiplier: config.sell_multiplier,
        merchant_gold,
    }));
    events.push(GameEvent::ShopOpened { npc: npc.clone() });
    Ok(events)
}

/// Close the open shop session, if any.
///
/// Also called implicitly when the player leaves the room or combat
/// starts. Never fails; closing a closed shop does nothing.
pub fn close_trade(state: &mut GameState) -> Vec<GameEvent> {
    let Some(Session::Trade(session)) = state.session.take() else {
        return Vec::new();
    };
    // Write the session purse back to the NPC.
    if let Some(ns) = state.npc_state_mut(&session.npc) {
        ns.gold = session.merchant_gold;
    }
    vec![GameEvent::ShopClosed { npc: session.npc }]
}

/// Buy an object from the open shop.
///
/// Price is the base price times the merchant's sell multiplier. The
/// transfer is atomic: gold and ownership move together or not at all.
pub fn buy(world: &World, state: &mut GameState, object: &ObjectId) -> MechanicsResult<Vec<GameEvent>> {
    let Some(Session::Trade(session)) = &state.session else {
        return Err(MechanicsError::NoTradeOpen);
    };
    let Some(position) = session.stock.iter().position(|o| o == object) else {
        return Err(MechanicsError::NotInStock(object.clone()));
    };
    let item = world
        .object(object)
        .ok_or_else(|| MechanicsError::NotInStock(object.clone()))?;
    let price = sell_price(item, session.sell_multiplier);
    if state.player.gold < price {
        return Err(MechanicsError::InsufficientFunds {
            needed: price,
            available: state.player.gold,
        });
    }

    // All checks passed; mutate in one go.
    let npc = session.npc.clone();
    let Some(Session::Trade(session)) = &mut state.session else {
        return Err(MechanicsError::NoTradeOpen);
    };
    session.stock.remove(position);
    if let Some(gold) = &mut session.merchant_gold {
        *gold += price;
    }
    state.player.gold -= price;
    state.move_object(object, ObjectLocation::Inventory);

    Ok(vec![GameEvent::ItemBought {
        npc,
        object: object.clone(),
    }])
}

/// Sell a carried object to the open shop.
///
/// Price is the base price times the merchant's buy multiplier. A
/// merchant with a finite purse that cannot pay rejects the sale.
pub fn sell(world: &World, state: &mut GameState, object: &ObjectId) -> MechanicsResult<Vec<GameEvent>> {
    let Some(Session::Trade(session)) = &state.session else {
        return Err(MechanicsError::NoTradeOpen);
    };
    if !state.in_inventory(object) {
        return Err(MechanicsError::NotCarried(object.clone()));
    }
    let item = world
        .object(object)
        .ok_or_else(|| MechanicsError::NotCarried(object.clone()))?;
    let price = buy_price(item, session.buy_multiplier);
    if let Some(gold) = session.merchant_gold
        && gold < price
    {
        return Err(MechanicsError::InsufficientFunds {
            needed: price,
            available: gold,
        });
    }

    let npc = session.npc.clone();
    let Some(Session::Trade(session)) = &mut state.session else {
        return Err(MechanicsError::NoTradeOpen);
    };
    session.stock.push(object.clone());
    if let Some(gold) = &mut session.merchant_gold {
        *gold -= price;
    }
    state.player.gold += price;
    state.move_object(object, ObjectLocation::Npc(npc.clone()));

    Ok(vec![GameEvent::ItemSold {
        npc,
        object: object.clone(),
    }])
}

/// Whether a trade session is currently open.
pub fn in_trade(state: &GameState) -> bool {
    matches!(state.session, Some(Session::Trade(_)))
}

/// What the merchant charges for an object: base price times the sell
/// multiplier, rounded half-up, never below one gold.
pub fn sell_price(object: &Object, sell_multiplier: f64) -> i64 {
    price_of(object.price, sell_multiplier)
}

/// What the merchant pays for an object: base price times the buy
/// multiplier, rounded half-up, never below one gold.
pub fn buy_price(object: &Object, buy_multiplier: f64) -> i64 {
    price_of(object.price, buy_multiplier)
}

fn price_of(base: i64, multiplier: f64) -> i64 {
    let scaled = (base as f64 * multiplier).round() as i64;
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use fabula_core::{Combatant, MerchantConfig, Npc, NpcMood, Room, WorldMeta};

    fn market_world(merchant_gold: Option<i64>) -> World {
        let mut world = World::new(WorldMeta::new("Market"), "square");
        world.add_room(Room::new("square", "the Square")).unwrap();
        world
            .add_object(
                Object::new("sword", "iron sword").with_price(30),
                ObjectLocation::Nowhere,
            )
            .unwrap();
        world
            .add_object(
                Object::new("pelt", "wolf pelt").with_price(8),
                ObjectLocation::Inventory,
            )
            .unwrap();
        world
            .add_npc(
                Npc::new("smith", "smith", "square").with_merchant(MerchantConfig {
                    gold: merchant_gold,
                    stock: vec!["sword".into()],
                    ..MerchantConfig::default()
                }),
            )
            .unwrap();
        world
    }

    #[test]
    fn opening_requires_a_merchant() {
        let mut world = market_world(None);
        world
            .add_npc(Npc::new("cat", "stray cat", "square"))
            .unwrap();
        let mut state = GameState::new_game(&world);

        let err = open_trade(&world, &mut state, &"cat".into()).unwrap_err();
        assert_eq!(err, MechanicsError::NotAMerchant("cat".into()));

        let events = open_trade(&world, &mut state, &"smith".into()).unwrap();
        assert_eq!(events, vec![GameEvent::ShopOpened { npc: "smith".into() }]);
        assert!(in_trade(&state));
    }

    #[test]
    fn buying_transfers_gold_and_ownership_atomically() {
        let world = market_world(None);
        let mut state = GameState::new_game(&world);
        state.player.gold = 50;
        open_trade(&world, &mut state, &"smith".into()).unwrap();

        let events = buy(&world, &mut state, &"sword".into()).unwrap();
        assert_eq!(state.player.gold, 20);
        assert!(state.in_inventory(&"sword".into()));
        assert_eq!(
            events,
            vec![GameEvent::ItemBought {
                npc: "smith".into(),
                object: "sword".into()
            }]
        );

        // Sold out now.
        let err = buy(&world, &mut state, &"sword".into()).unwrap_err();
        assert_eq!(err, MechanicsError::NotInStock("sword".into()));
    }

    #[test]
    fn buying_beyond_your_purse_changes_nothing() {
        let world = market_world(None);
        let mut state = GameState::new_game(&world);
        state.player.gold = 10;
        open_trade(&world, &mut state, &"smith".into()).unwrap();
        let before = state.clone();

        let err = buy(&world, &mut state, &"sword".into()).unwrap_err();
        assert_eq!(
            err,
            MechanicsError::InsufficientFunds {
                needed: 30,
                available: 10
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn selling_respects_a_finite_merchant_purse() {
        let world = market_world(Some(3));
        let mut state = GameState::new_game(&world);
        open_trade(&world, &mut state, &"smith".into()).unwrap();
        let before = state.clone();

        // The pelt fetches 8 x 0.5 = 4, but the smith only has 3.
        let err = sell(&world, &mut state, &"pelt".into()).unwrap_err();
        assert_eq!(
            err,
            MechanicsError::InsufficientFunds {
                needed: 4,
                available: 3
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn selling_moves_the_item_onto_the_merchant() {
        let world = market_world(None);
        let mut state = GameState::new_game(&world);
        open_trade(&world, &mut state, &"smith".into()).unwrap();

        let events = sell(&world, &mut state, &"pelt".into()).unwrap();
        assert_eq!(state.player.gold, 4);
        assert!(!state.in_inventory(&"pelt".into()));
        assert_eq!(
            events,
            vec![GameEvent::ItemSold {
                npc: "smith".into(),
                object: "pelt".into()
            }]
        );

        // And it can be bought back, dearer than it sold.
        let err = buy(&world, &mut state, &"pelt".into()).unwrap_err();
        assert_eq!(
            err,
            MechanicsError::InsufficientFunds {
                needed: 8,
                available: 4
            }
        );
    }

    #[test]
    fn round_trip_never_gains_gold() {
        let world = market_world(None);
        let mut state = GameState::new_game(&world);
        state.player.gold = 100;
        open_trade(&world, &mut state, &"smith".into()).unwrap();

        buy(&world, &mut state, &"sword".into()).unwrap();
        sell(&world, &mut state, &"sword".into()).unwrap();
        assert!(state.player.gold <= 100);
    }

    #[test]
    fn closing_persists_the_merchant_purse() {
        let world = market_world(Some(100));
        let mut state = GameState::new_game(&world);
        state.player.gold = 50;
        open_trade(&world, &mut state, &"smith".into()).unwrap();
        buy(&world, &mut state, &"sword".into()).unwrap();

        let events = close_trade(&mut state);
        assert_eq!(events, vec![GameEvent::ShopClosed { npc: "smith".into() }]);
        assert!(!in_trade(&state));
        assert_eq!(state.npc_state(&"smith".into()).unwrap().gold, Some(130));

        // Reopening sees the updated purse.
        open_trade(&world, &mut state, &"smith".into()).unwrap();
        match &state.session {
            Some(Session::Trade(t)) => assert_eq!(t.merchant_gold, Some(130)),
            other => panic!("expected trade session, got {other:?}"),
        }
    }

    #[test]
    fn trade_during_combat_is_rejected() {
        use rand::SeedableRng;

        let mut world = market_world(None);
        world
            .add_npc(
                Npc::new("thug", "thug", "square")
                    .with_mood(NpcMood::Hostile)
                    .with_combatant(Combatant::average()),
            )
            .unwrap();
        let mut state = GameState::new_game(&world);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        crate::combat::start_combat(&world, &mut state, &"thug".into(), &mut rng).unwrap();

        let err = open_trade(&world, &mut state, &"smith".into()).unwrap_err();
        assert_eq!(err, MechanicsError::TradeDuringCombat);
    }

    proptest! {
        // With the default multipliers (sell 1.0, buy 0.5) a buy-then-sell
        // round trip can never mint gold, whatever the base price.
        #[test]
        fn default_multipliers_never_profit(base in 0i64..100_000) {
            let object = Object::new("thing", "thing").with_price(base);
            let config = MerchantConfig::default();
            prop_assert!(
                buy_price(&object, config.buy_multiplier)
                    <= sell_price(&object, config.sell_multiplier)
            );
        }
    }
}
