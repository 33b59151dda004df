use runboard::graph::{NodeContext, WorkflowGraph};
use runboard::types::NodeId;
use serde_json::json;

/// The two-node workflow used across the manager tests:
/// `n1 --out/in--> n2`.
pub fn two_node_graph() -> WorkflowGraph {
    serde_json::from_value(json!({
        "nodes": {
            "n1": {"id": "n1", "predecessors": [], "successors": ["n2"],
                   "depth": 0, "execution_order": 0},
            "n2": {"id": "n2", "predecessors": ["n1"], "successors": [],
                   "depth": 1, "execution_order": 1}
        },
        "execution_order": ["n1", "n2"],
        "connections": [
            {"id": "e1", "source_node_id": "n1", "target_node_id": "n2",
             "source_port": "out", "target_port": "in"}
        ]
    }))
    .unwrap()
}

/// Context of `n2` in [`two_node_graph`].
pub fn n2_context() -> NodeContext {
    serde_json::from_value(json!({
        "node_id": "n2",
        "predecessors": ["n1"],
        "successors": [],
        "depth": 1,
        "execution_order": 1,
        "upstream_outputs": {"n1": {"out": "in"}},
        "downstream_inputs": {}
    }))
    .unwrap()
}

/// Bare context with just edge lists, for traversal tests.
pub fn context_with_edges(node_id: &str, predecessors: &[&str], successors: &[&str]) -> NodeContext {
    NodeContext {
        node_id: node_id.into(),
        predecessors: predecessors.iter().map(|&p| NodeId::from(p)).collect(),
        successors: successors.iter().map(|&s| NodeId::from(s)).collect(),
        ..NodeContext::default()
    }
}
