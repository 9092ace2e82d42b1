//! Ahead-of-play validation of worlds and script graphs.
//!
//! The authoring tool runs this before saving; play never starts on a
//! world with errors. Warnings flag suspicious-but-playable wiring.

use std::collections::{HashMap, HashSet};

use fabula_core::script::{Action, Condition, Node, NodeKind, ScriptGraph};
use fabula_core::state::ObjectLocation;
use fabula_core::{GraphId, NodeId, World};

/// A problem found during validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// The graph the issue belongs to, if graph-scoped.
    pub graph: Option<GraphId>,
    /// The node the issue anchors to, if node-scoped.
    pub node: Option<NodeId>,
    /// A human-readable description.
    pub message: String,
    /// Whether this is an error (true) or a warning (false).
    pub is_error: bool,
}

impl ValidationIssue {
    fn error(graph: &ScriptGraph, node: Option<&NodeId>, message: impl Into<String>) -> Self {
        Self {
            graph: Some(graph.id.clone()),
            node: node.cloned(),
            message: message.into(),
            is_error: true,
        }
    }

    fn warning(graph: &ScriptGraph, node: Option<&NodeId>, message: impl Into<String>) -> Self {
        Self {
            is_error: false,
            ..Self::error(graph, node, message)
        }
    }

    fn world_error(message: impl Into<String>) -> Self {
        Self {
            graph: None,
            node: None,
            message: message.into(),
            is_error: true,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = if self.is_error { "error" } else { "warning" };
        match (&self.graph, &self.node) {
            (Some(g), Some(n)) => write!(f, "{level}: {g}/{n}: {}", self.message),
            (Some(g), None) => write!(f, "{level}: {g}: {}", self.message),
            _ => write!(f, "{level}: {}", self.message),
        }
    }
}

/// Validate a whole world: cross-references plus every script graph.
///
/// Returns every issue found; an empty list means the world is playable.
pub fn validate_world(world: &World) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_references(world, &mut issues);
    for graph in world.graphs() {
        validate_graph(graph, world, &mut issues);
    }

    issues
}

/// World-level id cross-references.
fn validate_references(world: &World, issues: &mut Vec<ValidationIssue>) {
    if world.room(world.start_room()).is_none() {
        issues.push(ValidationIssue::world_error(format!(
            "start room \"{}\" does not exist",
            world.start_room()
        )));
    }

    for room in world.rooms() {
        for exit in &room.exits {
            if world.room(&exit.to).is_none() {
                issues.push(ValidationIssue::world_error(format!(
                    "room \"{}\" has an exit {} to unknown room \"{}\"",
                    room.id, exit.direction, exit.to
                )));
            }
            if let Some(door) = &exit.door
                && world.door(door).is_none()
            {
                issues.push(ValidationIssue::world_error(format!(
                    "room \"{}\" references unknown door \"{door}\"",
                    room.id
                )));
            }
        }
    }

    for door in world.doors() {
        if let Some(key) = &door.key
            && world.object(key).is_none()
        {
            issues.push(ValidationIssue::world_error(format!(
                "door \"{}\" references unknown key \"{key}\"",
                door.id
            )));
        }
    }

    for npc in world.npcs() {
        if world.room(&npc.room).is_none() {
            issues.push(ValidationIssue::world_error(format!(
                "npc \"{}\" starts in unknown room \"{}\"",
                npc.id, npc.room
            )));
        }
        for room in &npc.patrol {
            if world.room(room).is_none() {
                issues.push(ValidationIssue::world_error(format!(
                    "npc \"{}\" patrols through unknown room \"{room}\"",
                    npc.id
                )));
            }
        }
        if let Some(merchant) = &npc.merchant {
            for object in &merchant.stock {
                if world.object(object).is_none() {
                    issues.push(ValidationIssue::world_error(format!(
                        "merchant \"{}\" stocks unknown object \"{object}\"",
                        npc.id
                    )));
                }
            }
        }
    }

    for (object, location) in world.placements() {
        if world.object(object).is_none() {
            issues.push(ValidationIssue::world_error(format!(
                "placement references unknown object \"{object}\""
            )));
        }
        match location {
            ObjectLocation::Room(room) if world.room(room).is_none() => {
                issues.push(ValidationIssue::world_error(format!(
                    "object \"{object}\" is placed in unknown room \"{room}\""
                )));
            }
            ObjectLocation::Npc(npc) if world.npc(npc).is_none() => {
                issues.push(ValidationIssue::world_error(format!(
                    "object \"{object}\" is placed on unknown npc \"{npc}\""
                )));
            }
            ObjectLocation::Container(container) if world.object(container).is_none() => {
                issues.push(ValidationIssue::world_error(format!(
                    "object \"{object}\" is placed in unknown container \"{container}\""
                )));
            }
            _ => {}
        }
    }
}

/// Structural checks for one graph.
fn validate_graph(graph: &ScriptGraph, world: &World, issues: &mut Vec<ValidationIssue>) {
    let mut ids = HashSet::new();
    for node in &graph.nodes {
        if !ids.insert(node.id.clone()) {
            issues.push(ValidationIssue::error(
                graph,
                Some(&node.id),
                "duplicate node id",
            ));
        }
    }

    // Incoming edge counts, plus dangling-edge detection.
    let mut incoming: HashMap<&NodeId, usize> = HashMap::new();
    for node in &graph.nodes {
        for next in &node.next {
            if graph.node(next).is_none() {
                issues.push(ValidationIssue::error(
                    graph,
                    Some(&node.id),
                    format!("edge to missing node \"{next}\""),
                ));
            } else {
                *incoming.entry(next).or_default() += 1;
            }
        }
    }

    for node in &graph.nodes {
        let inbound = incoming.get(&node.id).copied().unwrap_or(0);
        match &node.kind {
            NodeKind::Trigger { .. } => {
                if inbound > 0 {
                    issues.push(ValidationIssue::error(
                        graph,
                        Some(&node.id),
                        "trigger node has incoming edges",
                    ));
                }
            }
            _ => {
                if inbound == 0 {
                    issues.push(ValidationIssue::warning(
                        graph,
                        Some(&node.id),
                        "node is not wired to any trigger",
                    ));
                }
            }
        }

        validate_node_shape(graph, node, issues);
        validate_node_references(graph, node, world, issues);
    }

    detect_cycles(graph, issues);
}

/// Arity checks per node kind.
fn validate_node_shape(graph: &ScriptGraph, node: &Node, issues: &mut Vec<ValidationIssue>) {
    match &node.kind {
        NodeKind::Branch { .. } => {
            if node.next.len() != 2 {
                issues.push(ValidationIssue::warning(
                    graph,
                    Some(&node.id),
                    format!("branch has {} edges, expected then/else", node.next.len()),
                ));
            }
        }
        NodeKind::RandomBranch { weights } => {
            if node.next.is_empty() {
                issues.push(ValidationIssue::error(
                    graph,
                    Some(&node.id),
                    "random branch has no outgoing edges",
                ));
            } else if weights.len() != node.next.len() {
                issues.push(ValidationIssue::error(
                    graph,
                    Some(&node.id),
                    format!(
                        "random branch has {} weights for {} edges",
                        weights.len(),
                        node.next.len()
                    ),
                ));
            }
        }
        NodeKind::Delay { .. } => {
            if node.next.is_empty() {
                issues.push(ValidationIssue::warning(
                    graph,
                    Some(&node.id),
                    "delay node has nothing to resume",
                ));
            }
        }
        _ => {}
    }
}

/// Entity references inside condition/action payloads.
fn validate_node_references(
    graph: &ScriptGraph,
    node: &Node,
    world: &World,
    issues: &mut Vec<ValidationIssue>,
) {
    match &node.kind {
        NodeKind::Condition(condition) | NodeKind::Branch { condition } => {
            check_condition(graph, node, condition, world, issues);
        }
        NodeKind::Action(action) => check_action(graph, node, action, world, issues),
        _ => {}
    }
}

fn check_condition(
    graph: &ScriptGraph,
    node: &Node,
    condition: &Condition,
    world: &World,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut missing = |what: String| {
        issues.push(ValidationIssue::error(graph, Some(&node.id), what));
    };
    match condition {
        Condition::HasItem { object } => {
            if world.object(object).is_none() {
                missing(format!("condition references unknown object \"{object}\""));
            }
        }
        Condition::PlayerIn { room } => {
            if world.room(room).is_none() {
                missing(format!("condition references unknown room \"{room}\""));
            }
        }
        Condition::NpcAlive { npc } => {
            if world.npc(npc).is_none() {
                missing(format!("condition references unknown npc \"{npc}\""));
            }
        }
        Condition::NpcIn { npc, room } => {
            if world.npc(npc).is_none() {
                missing(format!("condition references unknown npc \"{npc}\""));
            }
            if world.room(room).is_none() {
                missing(format!("condition references unknown room \"{room}\""));
            }
        }
        Condition::DoorOpen { door } => {
            if world.door(door).is_none() {
                missing(format!("condition references unknown door \"{door}\""));
            }
        }
        Condition::QuestAt { quest, .. } => {
            if world.quest(quest).is_none() {
                missing(format!("condition references unknown quest \"{quest}\""));
            }
        }
        Condition::Chance { percent } => {
            if *percent > 100 {
                issues.push(ValidationIssue::warning(
                    graph,
                    Some(&node.id),
                    format!("chance of {percent}% always succeeds"),
                ));
            }
        }
        Condition::Not(inner) => check_condition(graph, node, inner, world, issues),
        Condition::All(inner) | Condition::Any(inner) => {
            for c in inner {
                check_condition(graph, node, c, world, issues);
            }
        }
        Condition::FlagSet { .. }
        | Condition::FlagEquals { .. }
        | Condition::CounterCompare { .. } => {}
    }
}

fn check_action(
    graph: &ScriptGraph,
    node: &Node,
    action: &Action,
    world: &World,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut missing = |what: String| {
        issues.push(ValidationIssue::error(graph, Some(&node.id), what));
    };
    match action {
        Action::GiveItem { object } | Action::RemoveItem { object } => {
            if world.object(object).is_none() {
                missing(format!("action references unknown object \"{object}\""));
            }
        }
        Action::MoveItem { object, to } => {
            if world.object(object).is_none() {
                missing(format!("action references unknown object \"{object}\""));
            }
            match to {
                ObjectLocation::Room(room) if world.room(room).is_none() => {
                    missing(format!("action moves object to unknown room \"{room}\""));
                }
                ObjectLocation::Npc(npc) if world.npc(npc).is_none() => {
                    missing(format!("action moves object to unknown npc \"{npc}\""));
                }
                ObjectLocation::Container(c) if world.object(c).is_none() => {
                    missing(format!("action moves object to unknown container \"{c}\""));
                }
                _ => {}
            }
        }
        Action::MoveNpc { npc, room } => {
            if world.npc(npc).is_none() {
                missing(format!("action references unknown npc \"{npc}\""));
            }
            if world.room(room).is_none() {
                missing(format!("action references unknown room \"{room}\""));
            }
        }
        Action::SetNpcMood { npc, .. } | Action::StartConversation { npc } => {
            if world.npc(npc).is_none() {
                missing(format!("action references unknown npc \"{npc}\""));
            }
        }
        Action::OpenDoor { door } | Action::UnlockDoor { door } => {
            if world.door(door).is_none() {
                missing(format!("action references unknown door \"{door}\""));
            }
        }
        Action::StartQuest { quest } | Action::CompleteQuest { quest } => {
            if world.quest(quest).is_none() {
                missing(format!("action references unknown quest \"{quest}\""));
            }
        }
        Action::Teleport { room } => {
            if world.room(room).is_none() {
                missing(format!("action teleports to unknown room \"{room}\""));
            }
        }
        Action::ShowMessage { .. }
        | Action::PlaySound { .. }
        | Action::SetFlag { .. }
        | Action::AdjustCounter { .. }
        | Action::Heal { .. }
        | Action::Damage { .. }
        | Action::GiveGold { .. }
        | Action::TakeGold { .. }
        | Action::RaiseEvent { .. } => {}
    }
}

/// Cycle detection. Edges leaving a `Delay` node are cut points: a delay
/// defers re-entry to a later tick, so a loop through one is legal.
fn detect_cycles(graph: &ScriptGraph, issues: &mut Vec<ValidationIssue>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    fn visit(
        graph: &ScriptGraph,
        id: &NodeId,
        marks: &mut HashMap<NodeId, Mark>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        match marks.get(id) {
            Some(Mark::Done) => return,
            Some(Mark::InProgress) => {
                issues.push(ValidationIssue::error(
                    graph,
                    Some(id),
                    "cycle detected within one evaluation pass",
                ));
                return;
            }
            None => {}
        }
        let Some(node) = graph.node(id) else {
            return;
        };
        marks.insert(id.clone(), Mark::InProgress);
        if !matches!(node.kind, NodeKind::Delay { .. }) {
            for next in &node.next {
                visit(graph, next, marks, issues);
            }
        }
        marks.insert(id.clone(), Mark::Done);
    }

    let mut marks = HashMap::new();
    for trigger in graph.triggers() {
        for next in &trigger.next {
            visit(graph, next, &mut marks, issues);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::script::{Node, NodeKind};
    use fabula_core::{
        Condition, EventKind, EventScope, ObjectId, Room, WorldMeta,
    };
    use fabula_core::Action;

    fn world_with_graph(graph: ScriptGraph) -> World {
        let mut world = World::new(WorldMeta::new("Test"), "hall");
        world.add_room(Room::new("hall", "the Hall")).unwrap();
        world.add_graph(graph);
        world
    }

    fn errors(issues: &[ValidationIssue]) -> Vec<&ValidationIssue> {
        issues.iter().filter(|i| i.is_error).collect()
    }

    #[test]
    fn clean_graph_validates() {
        let graph = ScriptGraph::new("g", "ok")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["a".into()]),
            )
            .with_node(Node::new(
                "a",
                NodeKind::Action(Action::ShowMessage {
                    text: "hello".to_string(),
                }),
            ));
        let world = world_with_graph(graph);
        assert!(validate_world(&world).is_empty());
    }

    #[test]
    fn dangling_edge_is_an_error() {
        let graph = ScriptGraph::new("g", "broken").with_node(
            Node::new(
                "t",
                NodeKind::Trigger {
                    event: EventKind::RoomEnter,
                    scope: EventScope::Global,
                },
            )
            .with_next(vec!["nope".into()]),
        );
        let world = world_with_graph(graph);
        let issues = validate_world(&world);
        assert_eq!(errors(&issues).len(), 1);
        assert!(issues[0].message.contains("missing node"));
    }

    #[test]
    fn unwired_action_is_a_warning() {
        let graph = ScriptGraph::new("g", "floating").with_node(Node::new(
            "orphan",
            NodeKind::Action(Action::ShowMessage {
                text: "unreachable".to_string(),
            }),
        ));
        let world = world_with_graph(graph);
        let issues = validate_world(&world);
        assert!(errors(&issues).is_empty());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("not wired"));
    }

    #[test]
    fn unknown_entity_reference_is_an_error() {
        let graph = ScriptGraph::new("g", "refs")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["c".into()]),
            )
            .with_node(Node::new(
                "c",
                NodeKind::Condition(Condition::HasItem {
                    object: ObjectId::new("phantom"),
                }),
            ));
        let world = world_with_graph(graph);
        let issues = validate_world(&world);
        assert_eq!(errors(&issues).len(), 1);
        assert!(issues[0].message.contains("phantom"));
    }

    #[test]
    fn cycle_without_delay_is_an_error() {
        let graph = ScriptGraph::new("g", "loop")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["a".into()]),
            )
            .with_node(Node::new("a", NodeKind::Sequence).with_next(vec!["b".into()]))
            .with_node(Node::new("b", NodeKind::Sequence).with_next(vec!["a".into()]));
        let world = world_with_graph(graph);
        let issues = validate_world(&world);
        assert!(issues.iter().any(|i| i.is_error && i.message.contains("cycle")));
    }

    #[test]
    fn cycle_through_a_delay_is_legal() {
        let graph = ScriptGraph::new("g", "heartbeat")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["beat".into()]),
            )
            .with_node(
                Node::new(
                    "beat",
                    NodeKind::Action(Action::PlaySound {
                        cue: "thump".to_string(),
                    }),
                )
                .with_next(vec!["wait".into()]),
            )
            .with_node(
                Node::new("wait", NodeKind::Delay { ticks: 2 }).with_next(vec!["beat".into()]),
            );
        let world = world_with_graph(graph);
        let issues = validate_world(&world);
        assert!(errors(&issues).is_empty());
    }

    #[test]
    fn world_reference_errors_are_caught() {
        let mut world = World::new(WorldMeta::new("Test"), "nowhere");
        world.add_room(Room::new("hall", "the Hall")).unwrap();
        let issues = validate_world(&world);
        assert!(issues.iter().any(|i| i.message.contains("start room")));
    }

    #[test]
    fn random_branch_weight_mismatch_is_an_error() {
        let graph = ScriptGraph::new("g", "weights")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec!["r".into()]),
            )
            .with_node(
                Node::new(
                    "r",
                    NodeKind::RandomBranch {
                        weights: vec![1],
                    },
                )
                .with_next(vec!["a".into(), "b".into()]),
            )
            .with_node(Node::new("a", NodeKind::Sequence))
            .with_node(Node::new("b", NodeKind::Sequence));
        let world = world_with_graph(graph);
        let issues = validate_world(&world);
        assert!(issues
            .iter()
            .any(|i| i.is_error && i.message.contains("weights")));
    }
}
