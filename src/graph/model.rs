//! Wire models for the server-computed workflow graph.
//!
//! The backend builds and validates the dependency graph; the client only
//! deserializes and caches it. Consistency between `predecessors` and
//! `successors` lists, acyclicity, and the topological `execution_order` are
//! server guarantees and are not re-checked here.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Port wiring between two adjacent nodes: source port name to target port name.
pub type PortMap = FxHashMap<String, String>;

/// Per-node descriptor cached by the graph manager.
///
/// `upstream_outputs` maps each predecessor id to the ports of that
/// predecessor feeding this node's inputs; `downstream_inputs` is the
/// symmetric view toward successors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeContext {
    pub node_id: NodeId,
    #[serde(default)]
    pub predecessors: Vec<NodeId>,
    #[serde(default)]
    pub successors: Vec<NodeId>,
    /// Distance from a root node (no predecessors), server-computed.
    #[serde(default)]
    pub depth: u32,
    /// Position in a topologically valid linearization of the whole graph.
    #[serde(default)]
    pub execution_order: u32,
    #[serde(default)]
    pub upstream_outputs: FxHashMap<NodeId, PortMap>,
    #[serde(default)]
    pub downstream_inputs: FxHashMap<NodeId, PortMap>,
}

/// One node entry inside a [`WorkflowGraph`] snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    #[serde(default)]
    pub predecessors: Vec<NodeId>,
    #[serde(default)]
    pub successors: Vec<NodeId>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub execution_order: u32,
}

/// A directed edge carrying data from one node's output port to another's input port.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub source_port: String,
    pub target_port: String,
}

/// Whole-graph snapshot as returned by `GET /v1/workflows/{id}/graph`.
///
/// `execution_order` is a permutation of the keys of `nodes` consistent with
/// the partial order implied by the predecessor/successor lists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: FxHashMap<NodeId, GraphNode>,
    #[serde(default)]
    pub execution_order: Vec<NodeId>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl WorkflowGraph {
    /// Look up a node entry by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
