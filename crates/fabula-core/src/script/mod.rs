//! Script graph data: the author-built event → condition → action network.
//!
//! Graphs are authored in the visual editor and compiled into this node
//! set. Each node carries a tagged payload; the interpreter dispatches on
//! the tag with an exhaustive match, which is the enumerated dispatch
//! table built at compile time — no reflection, no name lookup at runtime.

mod action;
mod condition;

pub use action::Action;
pub use condition::{Comparison, Condition};

use serde::{Deserialize, Serialize};

use crate::event::{EventKind, EventScope};
use crate::ids::{GraphId, NodeId};

/// One authored script graph: a set of nodes wired by ordered edges.
///
/// Every edge fans out from a trigger node; graphs must be acyclic per
/// evaluation pass (an edge re-entering through a `Delay` node is legal —
/// the delay defers re-entry to a later tick).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptGraph {
    /// The graph's id.
    pub id: GraphId,
    /// Display name in the editor.
    pub name: String,
    /// Nodes in author order. Order matters only for trigger firing;
    /// execution order within a fan-out follows each node's edge list.
    pub nodes: Vec<Node>,
}

impl ScriptGraph {
    /// Create an empty graph.
    pub fn new(id: impl Into<GraphId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Add a node.
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// All trigger nodes in the graph.
    pub fn triggers(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Trigger { .. }))
    }
}

/// A single node: a tagged payload plus ordered outgoing edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The node's id, unique within its graph.
    pub id: NodeId,
    /// The payload deciding what the node does.
    pub kind: NodeKind,
    /// Outgoing edges, executed in order. `Branch` interprets the first
    /// edge as the then-arm and the second as the else-arm;
    /// `RandomBranch` picks exactly one edge by weight.
    #[serde(default)]
    pub next: Vec<NodeId>,
}

impl Node {
    /// Create a node with no outgoing edges.
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            next: Vec::new(),
        }
    }

    /// Set the outgoing edges.
    pub fn with_next(mut self, next: Vec<NodeId>) -> Self {
        self.next = next;
        self
    }
}

/// The tagged node payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point: fires when a matching event is dispatched.
    Trigger {
        /// The event kind this trigger subscribes to.
        event: EventKind,
        /// Where the trigger listens.
        scope: EventScope,
    },
    /// A predicate; failing it prunes the branch without error.
    /// Conditions chained along one edge have AND semantics.
    Condition(Condition),
    /// A state mutation or side-effect request.
    Action(Action),
    /// Two-way branch on a condition: edge 0 when true, edge 1 when false.
    Branch {
        /// The condition to test.
        condition: Condition,
    },
    /// Picks one outgoing edge at random, weighted.
    RandomBranch {
        /// One weight per outgoing edge.
        weights: Vec<u32>,
    },
    /// Defers the outgoing edges by a number of game-time ticks. The
    /// continuation persists in `GameState` across save/load.
    Delay {
        /// How many ticks to wait.
        ticks: u32,
    },
    /// A pass-through grouping node; runs its edges in order.
    Sequence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_node_lookup() {
        let graph = ScriptGraph::new("g1", "cave ambush")
            .with_node(
                Node::new(
                    "t",
                    NodeKind::Trigger {
                        event: EventKind::RoomEnter,
                        scope: EventScope::Global,
                    },
                )
                .with_next(vec![NodeId::new("a")]),
            )
            .with_node(Node::new(
                "a",
                NodeKind::Action(Action::ShowMessage {
                    text: "A draft of cold air.".to_string(),
                }),
            ));

        assert_eq!(graph.triggers().count(), 1);
        assert_eq!(graph.node(&NodeId::new("a")).unwrap().next.len(), 0);
        assert!(graph.node(&NodeId::new("zzz")).is_none());
    }
}
