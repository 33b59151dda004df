use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use runboard::api::{ApiError, GraphApi};
use runboard::graph::{NodeContext, WorkflowGraph};
use runboard::types::{NodeId, WorkflowId};
use rustc_hash::FxHashMap;

/// In-memory [`GraphApi`] that counts every fetch, so tests can assert the
/// manager's cache behavior without a server.
#[derive(Default)]
pub struct MockGraphApi {
    graph: Mutex<Option<WorkflowGraph>>,
    contexts: Mutex<FxHashMap<NodeId, NodeContext>>,
    graph_fetches: AtomicUsize,
    context_fetches: AtomicUsize,
}

impl MockGraphApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(self, graph: WorkflowGraph) -> Self {
        *self.graph.lock().unwrap() = Some(graph);
        self
    }

    pub fn with_context(self, context: NodeContext) -> Self {
        self.contexts
            .lock()
            .unwrap()
            .insert(context.node_id.clone(), context);
        self
    }

    /// Replace the served graph mid-test (simulates a server-side edit).
    pub fn set_graph(&self, graph: WorkflowGraph) {
        *self.graph.lock().unwrap() = Some(graph);
    }

    pub fn graph_fetches(&self) -> usize {
        self.graph_fetches.load(Ordering::SeqCst)
    }

    pub fn context_fetches(&self) -> usize {
        self.context_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphApi for MockGraphApi {
    async fn fetch_graph(&self, _workflow_id: &WorkflowId) -> Result<WorkflowGraph, ApiError> {
        self.graph_fetches.fetch_add(1, Ordering::SeqCst);
        self.graph
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                url: "mock://graph".to_string(),
            })
    }

    async fn fetch_node_context(
        &self,
        _workflow_id: &WorkflowId,
        node_id: &NodeId,
    ) -> Result<NodeContext, ApiError> {
        self.context_fetches.fetch_add(1, Ordering::SeqCst);
        self.contexts
            .lock()
            .unwrap()
            .get(node_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                url: format!("mock://nodes/{node_id}/context"),
            })
    }
}
