//! The reactive script interpreter.
//!
//! `handle` finds every trigger node matching the incoming event's kind
//! and scope, then walks each trigger's fan-out depth-first: conditions
//! short-circuit (AND along a chain), actions mutate state or emit
//! side-effect requests, branch and random nodes pick an edge, and delay
//! nodes persist a continuation into `GameState` for a later tick.

use std::collections::{HashSet, VecDeque};

use rand::Rng;
use rand::rngs::StdRng;
use tracing::warn;

use fabula_core::script::{Action, Condition, Node, NodeKind, ScriptGraph};
use fabula_core::state::ObjectLocation;
use fabula_core::{
    EventScope, GameEvent, GameState, GraphId, NodeId, QuestStage, SideEffectRequest, World,
};

/// The script interpreter. Stateless between invocations; everything that
/// must survive a call (delayed continuations) lives in `GameState`.
#[derive(Debug, Clone)]
pub struct Interpreter {
    /// How many generations of `RaiseEvent` cascades to follow before
    /// dropping further events.
    max_cascade_depth: usize,
}

impl Interpreter {
    /// Create an interpreter with the given cascade depth cap.
    pub fn new(max_cascade_depth: usize) -> Self {
        Self { max_cascade_depth }
    }

    /// Dispatch one event through every matching trigger.
    ///
    /// Returns the side-effect requests the orchestrator must apply, in
    /// execution order. Custom events raised by actions cascade within
    /// this call, depth-capped.
    pub fn handle(
        &self,
        event: &GameEvent,
        world: &World,
        state: &mut GameState,
        rng: &mut StdRng,
    ) -> Vec<SideEffectRequest> {
        let mut effects = Vec::new();
        let mut queue: VecDeque<(GameEvent, usize)> = VecDeque::new();
        queue.push_back((event.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            let mut raised = Vec::new();
            self.dispatch(&current, world, state, rng, &mut effects, &mut raised);
            for next in raised {
                if depth + 1 >= self.max_cascade_depth {
                    warn!(event = ?next, "cascade depth cap reached, dropping raised event");
                } else {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        effects
    }

    /// Resume a delayed continuation: execute the outgoing edges of the
    /// delay node that scheduled it.
    pub fn resume(
        &self,
        graph_id: &GraphId,
        node_id: &NodeId,
        world: &World,
        state: &mut GameState,
        rng: &mut StdRng,
    ) -> Vec<SideEffectRequest> {
        let mut effects = Vec::new();
        let mut raised = Vec::new();

        match world.graph(graph_id) {
            Some(graph) => match graph.node(node_id) {
                Some(node) => {
                    let next = node.next.clone();
                    self.run_chain(graph, &next, world, state, rng, &mut effects, &mut raised);
                }
                None => {
                    warn!(%graph_id, %node_id, "delayed continuation references a missing node");
                }
            },
            None => {
                warn!(%graph_id, "delayed continuation references a missing graph");
            }
        }

        // Events raised by the resumed branch cascade as usual.
        let mut queue: VecDeque<(GameEvent, usize)> =
            raised.into_iter().map(|e| (e, 1)).collect();
        while let Some((current, depth)) = queue.pop_front() {
            let mut more = Vec::new();
            self.dispatch(&current, world, state, rng, &mut effects, &mut more);
            for next in more {
                if depth + 1 >= self.max_cascade_depth {
                    warn!(event = ?next, "cascade depth cap reached, dropping raised event");
                } else {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        effects
    }

    /// Run every trigger matching one event.
    fn dispatch(
        &self,
        event: &GameEvent,
        world: &World,
        state: &mut GameState,
        rng: &mut StdRng,
        effects: &mut Vec<SideEffectRequest>,
        raised: &mut Vec<GameEvent>,
    ) {
        let kind = event.kind();
        for graph in world.graphs() {
            // Collect first: trigger matching must not observe mutations
            // made by an earlier trigger's actions in this same pass.
            let starts: Vec<Vec<NodeId>> = graph
                .triggers()
                .filter(|node| match &node.kind {
                    NodeKind::Trigger { event: e, scope } => {
                        *e == kind && scope_matches(scope, event, state)
                    }
                    _ => false,
                })
                .map(|node| node.next.clone())
                .collect();

            for next in starts {
                self.run_chain(graph, &next, world, state, rng, effects, raised);
            }
        }
    }

    /// Depth-first walk of a fan-out, in edge order.
    #[allow(clippy::too_many_arguments)]
    fn run_chain(
        &self,
        graph: &ScriptGraph,
        start: &[NodeId],
        world: &World,
        state: &mut GameState,
        rng: &mut StdRng,
        effects: &mut Vec<SideEffectRequest>,
        raised: &mut Vec<GameEvent>,
    ) {
        let mut stack: Vec<NodeId> = start.iter().rev().cloned().collect();
        let mut visited: HashSet<NodeId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                // The validator rejects cycles; this guards a graph that
                // slipped past it.
                warn!(graph = %graph.id, node = %id, "node revisited in one pass, skipping");
                continue;
            }
            let Some(node) = graph.node(&id) else {
                warn!(graph = %graph.id, node = %id, "edge to missing node, branch skipped");
                continue;
            };

            match &node.kind {
                NodeKind::Trigger { .. } => {
                    warn!(graph = %graph.id, node = %id, "trigger wired mid-chain, skipped");
                }
                NodeKind::Condition(condition) => {
                    if eval_condition(condition, world, state, rng) {
                        push_next(&mut stack, node);
                    }
                }
                NodeKind::Action(action) => {
                    apply_action(action, world, state, effects, raised);
                    push_next(&mut stack, node);
                }
                NodeKind::Branch { condition } => {
                    let arm = if eval_condition(condition, world, state, rng) {
                        node.next.first()
                    } else {
                        node.next.get(1)
                    };
                    if let Some(next) = arm {
                        stack.push(next.clone());
                    }
                }
                NodeKind::RandomBranch { weights } => {
                    if let Some(next) = pick_weighted(node, weights, rng) {
                        stack.push(next.clone());
                    }
                }
                NodeKind::Delay { ticks } => {
                    state.schedule_delay(graph.id.clone(), node.id.clone(), *ticks);
                }
                NodeKind::Sequence => {
                    push_next(&mut stack, node);
                }
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(8)
    }
}

fn push_next(stack: &mut Vec<NodeId>, node: &Node) {
    for id in node.next.iter().rev() {
        stack.push(id.clone());
    }
}

fn pick_weighted<'a>(node: &'a Node, weights: &[u32], rng: &mut StdRng) -> Option<&'a NodeId> {
    if node.next.is_empty() {
        return None;
    }
    let count = node.next.len().min(weights.len().max(1));
    let total: u32 = (0..count)
        .map(|i| weights.get(i).copied().unwrap_or(1))
        .sum();
    if total == 0 {
        return None;
    }
    let mut pick = rng.random_range(0..total);
    for i in 0..count {
        let w = weights.get(i).copied().unwrap_or(1);
        if pick < w {
            return node.next.get(i);
        }
        pick -= w;
    }
    node.next.first()
}

/// Whether a trigger's scope matches the event.
fn scope_matches(scope: &EventScope, event: &GameEvent, state: &GameState) -> bool {
    match scope {
        EventScope::Global => true,
        EventScope::Room(room) => match event.room() {
            Some(event_room) => event_room == room,
            None => &state.current_room == room,
        },
        EventScope::Npc(npc) => event.npc() == Some(npc),
        EventScope::Object(object) => event.object() == Some(object),
    }
}

/// Evaluate a condition node's predicate.
pub fn eval_condition(
    condition: &Condition,
    world: &World,
    state: &GameState,
    rng: &mut StdRng,
) -> bool {
    match condition {
        Condition::HasItem { object } => state.in_inventory(object),
        Condition::FlagSet { key } => state.flag_bool(key),
        Condition::FlagEquals { key, value } => state.flag(key) == Some(*value),
        Condition::CounterCompare { key, op, value } => op.matches(state.counter(key), *value),
        Condition::PlayerIn { room } => &state.current_room == room,
        Condition::NpcAlive { npc } => state.npc_state(npc).is_some_and(|n| n.alive),
        Condition::NpcIn { npc, room } => {
            state.npc_state(npc).is_some_and(|n| &n.room == room)
        }
        Condition::DoorOpen { door } => state.door_state(door).is_some_and(|d| d.open),
        Condition::QuestAt { quest, stage } => state.quest_stage(quest) == *stage,
        Condition::Chance { percent } => rng.random_range(0..100) < *percent,
        Condition::Not(inner) => !eval_condition(inner, world, state, rng),
        Condition::All(inner) => inner.iter().all(|c| eval_condition(c, world, state, rng)),
        Condition::Any(inner) => inner.iter().any(|c| eval_condition(c, world, state, rng)),
    }
}

/// Apply an action node: mutate state or emit a side-effect request.
fn apply_action(
    action: &Action,
    world: &World,
    state: &mut GameState,
    effects: &mut Vec<SideEffectRequest>,
    raised: &mut Vec<GameEvent>,
) {
    match action {
        Action::ShowMessage { text } => effects.push(SideEffectRequest::ShowMessage {
            text: text.clone(),
        }),
        Action::PlaySound { cue } => {
            effects.push(SideEffectRequest::PlaySound { cue: cue.clone() });
        }
        Action::SetFlag { key, value } => state.set_flag(key.clone(), *value),
        Action::AdjustCounter { key, delta } => state.adjust_counter(key.clone(), *delta),
        Action::GiveItem { object } => {
            state.move_object(object, ObjectLocation::Inventory);
        }
        Action::RemoveItem { object } => {
            state.move_object(object, ObjectLocation::Nowhere);
        }
        Action::MoveItem { object, to } => state.move_object(object, to.clone()),
        Action::MoveNpc { npc, room } => match state.npc_state_mut(npc) {
            Some(npc_state) => npc_state.room = room.clone(),
            None => warn!(%npc, "move_npc references an unknown npc, skipped"),
        },
        Action::SetNpcMood { npc, mood } => match state.npc_state_mut(npc) {
            Some(npc_state) => npc_state.mood = *mood,
            None => warn!(%npc, "set_npc_mood references an unknown npc, skipped"),
        },
        Action::OpenDoor { door } => match state.door_state_mut(door) {
            Some(door_state) => {
                door_state.open = true;
                door_state.locked = false;
            }
            None => warn!(%door, "open_door references an unknown door, skipped"),
        },
        Action::UnlockDoor { door } => match state.door_state_mut(door) {
            Some(door_state) => door_state.locked = false,
            None => warn!(%door, "unlock_door references an unknown door, skipped"),
        },
        Action::StartQuest { quest } => {
            if state.quest_stage(quest) == QuestStage::NotStarted {
                state.set_quest_stage(quest.clone(), QuestStage::Active);
                raised.push(GameEvent::QuestStarted {
                    quest: quest.clone(),
                });
            }
        }
        Action::CompleteQuest { quest } => {
            if state.quest_stage(quest) != QuestStage::Completed {
                state.set_quest_stage(quest.clone(), QuestStage::Completed);
                raised.push(GameEvent::QuestCompleted {
                    quest: quest.clone(),
                });
            }
        }
        Action::Heal { amount } => {
            let max = state.player.combatant.max_health;
            state.player.health = (state.player.health + amount).min(max);
        }
        Action::Damage { amount } => {
            // Scripted damage weakens but never kills outright.
            state.player.health = (state.player.health - amount).max(1);
        }
        Action::GiveGold { amount } => state.player.gold += amount,
        Action::TakeGold { amount } => {
            state.player.gold = (state.player.gold - amount).max(0);
        }
        Action::Teleport { room } => {
            if world.room(room).is_some() {
                effects.push(SideEffectRequest::Teleport { room: room.clone() });
            } else {
                warn!(%room, "teleport references an unknown room, skipped");
            }
        }
        Action::StartConversation { npc } => {
            effects.push(SideEffectRequest::StartConversation { npc: npc.clone() });
        }
        Action::RaiseEvent { label } => raised.push(GameEvent::Custom {
            label: label.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    use fabula_core::script::{Node, NodeKind};
    use fabula_core::{
        EventKind, FlagValue, Object, ObjectId, Room, RoomId, WorldMeta,
    };

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    /// A world with a cave that whispers when entered carrying the torch.
    fn cave_world() -> World {
        let mut world = World::new(WorldMeta::new("Test"), "camp");
        world.add_room(Room::new("camp", "the Camp")).unwrap();
        world.add_room(Room::new("cave", "the Cave")).unwrap();
        world
            .add_object(
                Object::new("torch", "torch"),
                ObjectLocation::Room(RoomId::new("camp")),
            )
            .unwrap();

        let graph = ScriptGraph::new("whispers", "cave whispers")
            .with_node(
                Node::new(
                    "on-enter",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Room(RoomId::new("cave")),
                    },
                )
                .with_next(vec!["has-torch".into()]),
            )
            .with_node(
                Node::new(
                    "has-torch",
                    NodeKind::Condition(Condition::HasItem {
                        object: ObjectId::new("torch"),
                    }),
                )
                .with_next(vec!["whisper".into()]),
            )
            .with_node(Node::new(
                "whisper",
                NodeKind::Action(Action::ShowMessage {
                    text: "The walls whisper.".to_string(),
                }),
            ));
        world.add_graph(graph);
        world
    }

    #[test]
    fn failed_condition_prunes_the_branch() {
        let world = cave_world();
        let mut state = GameState::new_game(&world);
        let interpreter = Interpreter::default();

        // Entering the cave without the torch: no effects at all.
        let effects = interpreter.handle(
            &GameEvent::RoomEntered {
                room: RoomId::new("cave"),
            },
            &world,
            &mut state,
            &mut rng(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn passing_condition_runs_the_action() {
        let world = cave_world();
        let mut state = GameState::new_game(&world);
        state.move_object(&ObjectId::new("torch"), ObjectLocation::Inventory);
        let interpreter = Interpreter::default();

        let effects = interpreter.handle(
            &GameEvent::RoomEntered {
                room: RoomId::new("cave"),
            },
            &world,
            &mut state,
            &mut rng(),
        );
        assert_eq!(
            effects,
            vec![SideEffectRequest::ShowMessage {
                text: "The walls whisper.".to_string()
            }]
        );
    }

    #[test]
    fn room_scope_must_match_exactly() {
        let world = cave_world();
        let mut state = GameState::new_game(&world);
        state.move_object(&ObjectId::new("torch"), ObjectLocation::Inventory);
        let interpreter = Interpreter::default();

        // Entering the camp, not the cave: the trigger stays silent.
        let effects = interpreter.handle(
            &GameEvent::RoomEntered {
                room: RoomId::new("camp"),
            },
            &world,
            &mut state,
            &mut rng(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn branch_picks_then_and_else_arms() {
        let mut world = World::new(WorldMeta::new("Test"), "camp");
        world.add_room(Room::new("camp", "the Camp")).unwrap();
        let graph = ScriptGraph::new("g", "branch test")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::Custom("check".to_string()),
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["b".into()]),
            )
            .with_node(
                Node::new(
                    "b",
                    NodeKind::Branch {
                        condition: Condition::FlagSet {
                            key: "brave".to_string(),
                        },
                    },
                )
                .with_next(vec!["yes".into(), "no".into()]),
            )
            .with_node(Node::new(
                "yes",
                NodeKind::Action(Action::ShowMessage {
                    text: "Onward!".to_string(),
                }),
            ))
            .with_node(Node::new(
                "no",
                NodeKind::Action(Action::ShowMessage {
                    text: "You hesitate.".to_string(),
                }),
            ));
        world.add_graph(graph);

        let interpreter = Interpreter::default();
        let event = GameEvent::Custom {
            label: "check".to_string(),
        };

        let mut state = GameState::new_game(&world);
        let effects = interpreter.handle(&event, &world, &mut state, &mut rng());
        assert_eq!(
            effects,
            vec![SideEffectRequest::ShowMessage {
                text: "You hesitate.".to_string()
            }]
        );

        state.set_flag("brave", FlagValue::Bool(true));
        let effects = interpreter.handle(&event, &world, &mut state, &mut rng());
        assert_eq!(
            effects,
            vec![SideEffectRequest::ShowMessage {
                text: "Onward!".to_string()
            }]
        );
    }

    #[test]
    fn delay_schedules_a_continuation_instead_of_running() {
        let mut world = World::new(WorldMeta::new("Test"), "camp");
        world.add_room(Room::new("camp", "the Camp")).unwrap();
        let graph = ScriptGraph::new("g", "delay test")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::Custom("fuse".to_string()),
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["wait".into()]),
            )
            .with_node(
                Node::new("wait", NodeKind::Delay { ticks: 3 }).with_next(vec!["boom".into()]),
            )
            .with_node(Node::new(
                "boom",
                NodeKind::Action(Action::ShowMessage {
                    text: "Boom!".to_string(),
                }),
            ));
        world.add_graph(graph);

        let interpreter = Interpreter::default();
        let mut state = GameState::new_game(&world);
        let effects = interpreter.handle(
            &GameEvent::Custom {
                label: "fuse".to_string(),
            },
            &world,
            &mut state,
            &mut rng(),
        );

        assert!(effects.is_empty());
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending[0].remaining, 3);

        // Resuming executes the delay node's fan-out.
        let pending = state.pending.remove(0);
        let effects =
            interpreter.resume(&pending.graph, &pending.node, &world, &mut state, &mut rng());
        assert_eq!(
            effects,
            vec![SideEffectRequest::ShowMessage {
                text: "Boom!".to_string()
            }]
        );
    }

    #[test]
    fn raised_events_cascade_depth_capped() {
        let mut world = World::new(WorldMeta::new("Test"), "camp");
        world.add_room(Room::new("camp", "the Camp")).unwrap();
        // "echo" raises "echo" forever; the cap must stop it.
        let graph = ScriptGraph::new("g", "echo")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::Custom("echo".to_string()),
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["count".into()]),
            )
            .with_node(
                Node::new(
                    "count",
                    NodeKind::Action(Action::AdjustCounter {
                        key: "echoes".to_string(),
                        delta: 1,
                    }),
                )
                .with_next(vec!["again".into()]),
            )
            .with_node(Node::new(
                "again",
                NodeKind::Action(Action::RaiseEvent {
                    label: "echo".to_string(),
                }),
            ));
        world.add_graph(graph);

        let interpreter = Interpreter::new(4);
        let mut state = GameState::new_game(&world);
        interpreter.handle(
            &GameEvent::Custom {
                label: "echo".to_string(),
            },
            &world,
            &mut state,
            &mut rng(),
        );
        assert_eq!(state.counter("echoes"), 4);
    }

    #[test]
    fn random_branch_is_deterministic_under_a_seed() {
        let mut world = World::new(WorldMeta::new("Test"), "camp");
        world.add_room(Room::new("camp", "the Camp")).unwrap();
        let graph = ScriptGraph::new("g", "coin flip")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::Custom("flip".to_string()),
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["r".into()]),
            )
            .with_node(
                Node::new(
                    "r",
                    NodeKind::RandomBranch {
                        weights: vec![1, 1],
                    },
                )
                .with_next(vec!["heads".into(), "tails".into()]),
            )
            .with_node(Node::new(
                "heads",
                NodeKind::Action(Action::SetFlag {
                    key: "coin".to_string(),
                    value: FlagValue::Int(0),
                }),
            ))
            .with_node(Node::new(
                "tails",
                NodeKind::Action(Action::SetFlag {
                    key: "coin".to_string(),
                    value: FlagValue::Int(1),
                }),
            ));
        world.add_graph(graph);

        let run = |seed: u64| {
            let interpreter = Interpreter::default();
            let mut state = GameState::new_game(&world);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut outcomes = Vec::new();
            for _ in 0..10 {
                interpreter.handle(
                    &GameEvent::Custom {
                        label: "flip".to_string(),
                    },
                    &world,
                    &mut state,
                    &mut rng,
                );
                outcomes.push(state.counter("coin"));
            }
            outcomes
        };

        assert_eq!(run(42), run(42));
    }

    #[test]
    fn dangling_edge_is_skipped_not_fatal() {
        let mut world = World::new(WorldMeta::new("Test"), "camp");
        world.add_room(Room::new("camp", "the Camp")).unwrap();
        let graph = ScriptGraph::new("g", "broken")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::Custom("go".to_string()),
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["missing".into(), "ok".into()]),
            )
            .with_node(Node::new(
                "ok",
                NodeKind::Action(Action::ShowMessage {
                    text: "Still here.".to_string(),
                }),
            ));
        world.add_graph(graph);

        let interpreter = Interpreter::default();
        let mut state = GameState::new_game(&world);
        let effects = interpreter.handle(
            &GameEvent::Custom {
                label: "go".to_string(),
            },
            &world,
            &mut state,
            &mut rng(),
        );
        assert_eq!(
            effects,
            vec![SideEffectRequest::ShowMessage {
                text: "Still here.".to_string()
            }]
        );
    }
}
