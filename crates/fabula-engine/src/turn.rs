//! Background turn processing: the external clock's entry point.
//!
//! Each call is one atomic unit, shaped like a player command: advance the
//! clock, decay needs, step patrols, resume due delayed scripts, then
//! dispatch the turn event — all cascading script work resolves before the
//! call returns.

use rand::rngs::StdRng;

use fabula_core::{GameEvent, GameState, NeedKind, Session, World};
use fabula_script::Interpreter;

use crate::bus;
use crate::config::EngineConfig;
use crate::narration::Narration;

/// Advance game time by one tick.
pub(crate) fn advance(
    world: &World,
    state: &mut GameState,
    interpreter: &Interpreter,
    rng: &mut StdRng,
    config: &EngineConfig,
) -> Narration {
    let tick = state.clock.advance();
    let mut narration = Narration::new();
    let mut events = Vec::new();

    decay_needs(state, config, &mut events);
    if !matches!(state.session, Some(Session::Combat(_))) {
        step_patrols(world, state);
    }

    // Delayed continuations count down in game time; due ones resume now.
    let mut due = Vec::new();
    state.pending.retain_mut(|pending| {
        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining == 0 {
            due.push((pending.graph.clone(), pending.node.clone()));
            false
        } else {
            true
        }
    });
    for (graph, node) in due {
        let effects = interpreter.resume(&graph, &node, world, state, rng);
        bus::run(
            world,
            state,
            interpreter,
            rng,
            &mut narration,
            Vec::new(),
            effects,
        );
    }

    events.push(GameEvent::TurnElapsed { tick });
    bus::run(
        world,
        state,
        interpreter,
        rng,
        &mut narration,
        events,
        Vec::new(),
    );

    narration
}

/// Decay the player's needs and raise `NeedCritical` on the way down.
fn decay_needs(state: &mut GameState, config: &EngineConfig, events: &mut Vec<GameEvent>) {
    let threshold = config.need_critical_threshold;
    for (kind, rate) in [
        (NeedKind::Hunger, config.hunger_decay),
        (NeedKind::Thirst, config.thirst_decay),
        (NeedKind::Rest, config.rest_decay),
    ] {
        let before = state.player.needs.get(kind);
        state.player.needs.decay(kind, rate);
        let after = state.player.needs.get(kind);
        if before > threshold && after <= threshold {
            events.push(GameEvent::NeedCritical { need: kind });
        }
    }

    // Fully depleted needs wear the body down, but exhaustion alone never
    // kills outside combat.
    let depleted = NeedKind::ALL
        .iter()
        .any(|kind| state.player.needs.get(*kind) <= 0.0);
    if depleted && !matches!(state.session, Some(Session::Combat(_))) {
        state.player.health = (state.player.health - 1).max(1);
    }
}

/// Walk each patrolling NPC one step along its route.
fn step_patrols(world: &World, state: &mut GameState) {
    for npc in world.npcs() {
        if npc.patrol.is_empty() {
            continue;
        }
        if let Some(ns) = state.npc_state_mut(&npc.id)
            && ns.alive
        {
            ns.patrol_index = (ns.patrol_index + 1) % npc.patrol.len();
            ns.room = npc.patrol[ns.patrol_index].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use fabula_core::{Npc, Room, RoomId, WorldMeta};

    fn world_with_sentry() -> World {
        let mut world = World::new(WorldMeta::new("Test"), "yard");
        world.add_room(Room::new("yard", "the Yard")).unwrap();
        world.add_room(Room::new("wall", "the Wall")).unwrap();
        world
            .add_npc(
                Npc::new("sentry", "sentry", "yard")
                    .with_patrol(vec![RoomId::new("yard"), RoomId::new("wall")]),
            )
            .unwrap();
        world
    }

    #[test]
    fn needs_decay_and_go_critical() {
        let world = world_with_sentry();
        let mut state = GameState::new_game(&world);
        let interpreter = Interpreter::default();
        let mut rng = StdRng::seed_from_u64(1);
        let config = EngineConfig {
            thirst_decay: 0.5,
            ..EngineConfig::default()
        };

        advance(&world, &mut state, &interpreter, &mut rng, &config);
        assert!((state.player.needs.thirst - 0.5).abs() < 1e-6);
        // Second tick crosses the 0.2 threshold.
        advance(&world, &mut state, &interpreter, &mut rng, &config);
        assert!(state.player.needs.thirst <= 0.2);
    }

    #[test]
    fn depleted_needs_erode_health_to_a_floor() {
        let world = world_with_sentry();
        let mut state = GameState::new_game(&world);
        state.player.needs.hunger = 0.0;
        state.player.health = 3;
        let interpreter = Interpreter::default();
        let mut rng = StdRng::seed_from_u64(1);
        let config = EngineConfig::default();

        for _ in 0..10 {
            advance(&world, &mut state, &interpreter, &mut rng, &config);
        }
        assert_eq!(state.player.health, 1);
    }

    #[test]
    fn patrols_cycle_through_their_route() {
        let world = world_with_sentry();
        let mut state = GameState::new_game(&world);
        let interpreter = Interpreter::default();
        let mut rng = StdRng::seed_from_u64(1);
        let config = EngineConfig::default();

        advance(&world, &mut state, &interpreter, &mut rng, &config);
        assert_eq!(
            state.npc_state(&"sentry".into()).unwrap().room,
            RoomId::new("wall")
        );
        advance(&world, &mut state, &interpreter, &mut rng, &config);
        assert_eq!(
            state.npc_state(&"sentry".into()).unwrap().room,
            RoomId::new("yard")
        );
    }

    #[test]
    fn clock_ticks_accumulate() {
        let world = world_with_sentry();
        let mut state = GameState::new_game(&world);
        let interpreter = Interpreter::default();
        let mut rng = StdRng::seed_from_u64(1);
        let config = EngineConfig::default();

        for _ in 0..5 {
            advance(&world, &mut state, &interpreter, &mut rng, &config);
        }
        assert_eq!(state.clock.tick, 5);
    }
}
