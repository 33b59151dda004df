//! Workflow dependency graph cache and queries.
//!
//! The graph itself is computed and validated server-side; this module only
//! caches it and answers traversal questions for the pipeline editor. See
//! [`WorkflowGraphManager`] for the session lifecycle.

pub mod manager;
pub mod model;

pub use manager::{NodeCallback, NodeSubscription, WorkflowGraphManager};
pub use model::{Connection, GraphNode, NodeContext, PortMap, WorkflowGraph};
