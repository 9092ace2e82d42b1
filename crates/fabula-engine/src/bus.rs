//! The event bus: synchronous, single-threaded dispatch into the script
//! interpreter.
//!
//! Fan-out is a direct function call, not a queued publish-subscribe
//! system — ordering guarantees come from synchronous delivery. The one
//! side effect the bus applies itself is `Teleport`, because moving the
//! player must run full room-change logic (shop auto-close, exit/enter
//! events, fresh description), which in turn feeds more events through
//! the same dispatch loop.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use tracing::warn;

use fabula_core::{GameEvent, GameState, SideEffectRequest, World};
use fabula_mechanics::trade;
use fabula_script::Interpreter;

use crate::describe;
use crate::narration::Narration;

/// Teleports applied within one dispatch before the bus refuses more.
const MAX_TELEPORTS: u32 = 16;

/// Route events through the interpreter until the cascade settles.
///
/// `effects` seeds the loop with side effects produced before dispatch
/// (e.g. by a resumed delayed script).
pub(crate) fn run(
    world: &World,
    state: &mut GameState,
    interpreter: &Interpreter,
    rng: &mut StdRng,
    narration: &mut Narration,
    events: Vec<GameEvent>,
    effects: Vec<SideEffectRequest>,
) {
    let mut queue: VecDeque<GameEvent> = events.into();
    let mut teleports = 0;

    let mut pending_effects: VecDeque<SideEffectRequest> = effects.into();
    loop {
        while let Some(effect) = pending_effects.pop_front() {
            apply_effect(
                world,
                state,
                effect,
                &mut queue,
                narration,
                &mut teleports,
            );
        }
        let Some(event) = queue.pop_front() else {
            break;
        };
        for effect in interpreter.handle(&event, world, state, rng) {
            pending_effects.push_back(effect);
        }
    }
}

fn apply_effect(
    world: &World,
    state: &mut GameState,
    effect: SideEffectRequest,
    queue: &mut VecDeque<GameEvent>,
    narration: &mut Narration,
    teleports: &mut u32,
) {
    match effect {
        SideEffectRequest::Teleport { room } => {
            if world.room(&room).is_none() {
                warn!(%room, "teleport to unknown room dropped");
                return;
            }
            if *teleports >= MAX_TELEPORTS {
                warn!(%room, "teleport limit reached, dropping");
                return;
            }
            *teleports += 1;

            for event in trade::close_trade(state) {
                queue.push_back(event);
            }
            queue.push_back(GameEvent::RoomExited {
                room: state.current_room.clone(),
            });
            state.current_room = room.clone();
            state.last_referent = None;
            for line in describe::room_lines(world, state) {
                narration.push(line);
            }
            narration.effects.push(SideEffectRequest::UpdateMap);
            queue.push_back(GameEvent::RoomEntered { room });
        }
        other => narration.absorb(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use fabula_core::script::{Action, Node, NodeKind, ScriptGraph};
    use fabula_core::{EventKind, EventScope, Room, RoomId, WorldMeta};

    #[test]
    fn teleport_effect_moves_the_player_and_fires_room_events() {
        let mut world = World::new(WorldMeta::new("Test"), "a");
        world.add_room(Room::new("a", "Room A")).unwrap();
        world.add_room(Room::new("b", "Room B")).unwrap();
        // Entering A teleports to B; entering B leaves a trace message.
        world.add_graph(
            ScriptGraph::new("g1", "portal")
                .with_node(
                    Node::new(
                        "t",
                        NodeKind::Trigger {
                            event: EventKind::RoomEnter,
                            scope: EventScope::Room(RoomId::new("a")),
                        },
                    )
                    .with_next(vec!["port".into()]),
                )
                .with_node(Node::new(
                    "port",
                    NodeKind::Action(Action::Teleport {
                        room: RoomId::new("b"),
                    }),
                )),
        );
        world.add_graph(
            ScriptGraph::new("g2", "arrival")
                .with_node(
                    Node::new(
                        "t",
                        NodeKind::Trigger {
                            event: EventKind::RoomEnter,
                            scope: EventScope::Room(RoomId::new("b")),
                        },
                    )
                    .with_next(vec!["msg".into()]),
                )
                .with_node(Node::new(
                    "msg",
                    NodeKind::Action(Action::ShowMessage {
                        text: "A shimmer fades behind you.".to_string(),
                    }),
                )),
        );

        let mut state = GameState::new_game(&world);
        let interpreter = Interpreter::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut narration = Narration::new();

        run(
            &world,
            &mut state,
            &interpreter,
            &mut rng,
            &mut narration,
            vec![GameEvent::RoomEntered {
                room: RoomId::new("a"),
            }],
            Vec::new(),
        );

        assert_eq!(state.current_room, RoomId::new("b"));
        assert!(narration.lines.iter().any(|l| l.contains("Room B")));
        assert!(narration.lines.iter().any(|l| l.contains("shimmer")));
    }
}
