//! In-memory authority for a workflow's dependency graph.
//!
//! [`WorkflowGraphManager`] decouples page components from repeated network
//! calls: the whole-graph snapshot and per-node contexts are fetched through
//! an injected [`GraphApi`] and cached until [`clear`](WorkflowGraphManager::clear)
//! is called (typically when leaving a workflow-editing session). The server
//! is the source of truth; nothing here persists beyond the process.
//!
//! The manager is constructed once by the application's composition root and
//! shared via `Arc`. Interior state sits behind a `std::sync::Mutex` that is
//! never held across an await point, so concurrent readers and page-driven
//! mutations serialize cleanly.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use runboard::api::HttpGraphApi;
//! use runboard::graph::WorkflowGraphManager;
//!
//! # async fn demo() -> Result<(), runboard::api::ApiError> {
//! let api = Arc::new(HttpGraphApi::new("https://backend.example.com"));
//! let manager = WorkflowGraphManager::new(api);
//!
//! let graph = manager.load_graph(&"wf1".into()).await?;
//! assert_eq!(graph.execution_order, manager.execution_order());
//!
//! let ctx = manager.node_context(&"wf1".into(), &"n2".into()).await?;
//! assert_eq!(manager.upstream_nodes(&"n2".into()), ctx.predecessors);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use crate::api::{ApiError, GraphApi};
use crate::graph::model::{NodeContext, WorkflowGraph};
use crate::types::{NodeId, WorkflowId};

/// Callback invoked when a node's cached context changes.
///
/// Callbacks run synchronously inside [`WorkflowGraphManager::notify_node_change`]
/// and must be quick; invocation order across callbacks for the same node is
/// unspecified.
pub type NodeCallback = Arc<dyn Fn(&NodeContext) + Send + Sync + 'static>;

/// Token returned by [`WorkflowGraphManager::subscribe`].
///
/// Passing it to [`WorkflowGraphManager::unsubscribe`] removes exactly the
/// registration it was issued for, leaving other callbacks on the same node
/// untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSubscription {
    node_id: NodeId,
    token: Uuid,
}

impl NodeSubscription {
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }
}

struct Listener {
    token: Uuid,
    callback: NodeCallback,
}

#[derive(Default)]
struct ManagerState {
    graph: Option<WorkflowGraph>,
    node_contexts: FxHashMap<NodeId, NodeContext>,
    listeners: FxHashMap<NodeId, Vec<Listener>>,
}

enum Direction {
    Upstream,
    Downstream,
}

/// Session-wide cache and query surface for one workflow's dependency graph.
pub struct WorkflowGraphManager {
    api: Arc<dyn GraphApi>,
    state: Mutex<ManagerState>,
}

impl WorkflowGraphManager {
    /// Create a manager backed by the given API client.
    #[must_use]
    pub fn new(api: Arc<dyn GraphApi>) -> Self {
        Self {
            api,
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Fetch the whole-graph snapshot and replace the cached graph in full.
    ///
    /// The previous snapshot is dropped wholesale, so stale entries for nodes
    /// removed server-side disappear with it. Transport and decode errors
    /// propagate untouched; the cached graph is left as it was on failure.
    pub async fn load_graph(&self, workflow_id: &WorkflowId) -> Result<WorkflowGraph, ApiError> {
        let graph = self.api.fetch_graph(workflow_id).await?;
        tracing::debug!(%workflow_id, nodes = graph.nodes.len(), "workflow graph replaced");
        self.state.lock().unwrap().graph = Some(graph.clone());
        Ok(graph)
    }

    /// Fetch one node's context and overwrite its cache entry.
    ///
    /// Other nodes' entries are untouched and listeners are not notified;
    /// notification is the separate, explicit
    /// [`notify_node_change`](Self::notify_node_change) step.
    pub async fn load_node_context(
        &self,
        workflow_id: &WorkflowId,
        node_id: &NodeId,
    ) -> Result<NodeContext, ApiError> {
        let context = self.api.fetch_node_context(workflow_id, node_id).await?;
        self.state
            .lock()
            .unwrap()
            .node_contexts
            .insert(node_id.clone(), context.clone());
        Ok(context)
    }

    /// Return the cached context for a node, fetching it on first access.
    ///
    /// A cache hit performs no network call. This is memoize-on-first-access,
    /// not a TTL cache; [`clear`](Self::clear) is the only invalidation path.
    pub async fn node_context(
        &self,
        workflow_id: &WorkflowId,
        node_id: &NodeId,
    ) -> Result<NodeContext, ApiError> {
        if let Some(cached) = self.state.lock().unwrap().node_contexts.get(node_id) {
            return Ok(cached.clone());
        }
        self.load_node_context(workflow_id, node_id).await
    }

    /// Direct predecessors of a node, or empty if its context is not cached.
    #[must_use]
    pub fn upstream_nodes(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.state
            .lock()
            .unwrap()
            .node_contexts
            .get(node_id)
            .map(|ctx| ctx.predecessors.clone())
            .unwrap_or_default()
    }

    /// Direct successors of a node, or empty if its context is not cached.
    #[must_use]
    pub fn downstream_nodes(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.state
            .lock()
            .unwrap()
            .node_contexts
            .get(node_id)
            .map(|ctx| ctx.successors.clone())
            .unwrap_or_default()
    }

    /// Topological execution order of the loaded graph, or empty if none.
    #[must_use]
    pub fn execution_order(&self) -> Vec<NodeId> {
        self.state
            .lock()
            .unwrap()
            .graph
            .as_ref()
            .map(|graph| graph.execution_order.clone())
            .unwrap_or_default()
    }

    /// Cached depth of a node, or `None` when its context is not cached.
    ///
    /// `Some(0)` is a genuine root; `None` means the caller has not loaded
    /// the context yet.
    #[must_use]
    pub fn node_depth(&self, node_id: &NodeId) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .node_contexts
            .get(node_id)
            .map(|ctx| ctx.depth)
    }

    /// Register a callback for context changes on one node.
    ///
    /// Multiple callbacks per node are allowed; each call yields a distinct
    /// [`NodeSubscription`].
    #[must_use]
    pub fn subscribe(&self, node_id: &NodeId, callback: NodeCallback) -> NodeSubscription {
        let token = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .listeners
            .entry(node_id.clone())
            .or_default()
            .push(Listener {
                token,
                callback,
            });
        NodeSubscription {
            node_id: node_id.clone(),
            token,
        }
    }

    /// Remove exactly the registration behind `subscription`.
    ///
    /// Unknown or already-removed subscriptions are a no-op.
    pub fn unsubscribe(&self, subscription: &NodeSubscription) {
        let mut state = self.state.lock().unwrap();
        if let Some(listeners) = state.listeners.get_mut(&subscription.node_id) {
            listeners.retain(|listener| listener.token != subscription.token);
            if listeners.is_empty() {
                state.listeners.remove(&subscription.node_id);
            }
        }
    }

    /// Update a node's cached context and synchronously notify its listeners.
    ///
    /// Callbacks run outside the state lock, so they may call back into the
    /// manager.
    pub fn notify_node_change(&self, node_id: &NodeId, context: NodeContext) {
        let callbacks: Vec<NodeCallback> = {
            let mut state = self.state.lock().unwrap();
            state.node_contexts.insert(node_id.clone(), context.clone());
            state
                .listeners
                .get(node_id)
                .map(|listeners| {
                    listeners
                        .iter()
                        .map(|listener| Arc::clone(&listener.callback))
                        .collect()
                })
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(&context);
        }
    }

    /// Drop the graph, all cached contexts, and all listeners.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.graph = None;
        state.node_contexts.clear();
        state.listeners.clear();
        tracing::debug!("workflow graph cache cleared");
    }

    /// All transitive predecessors reachable through *cached* contexts.
    ///
    /// Breadth-first over the cached context graph: a reachable node whose
    /// context was never loaded is collected but acts as a dead end, so the
    /// chain can under-report when contexts were not pre-loaded. Each node is
    /// visited at most once; the starting node is excluded unless an edge
    /// cycle leads back to it.
    #[must_use]
    pub fn upstream_chain(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.chain(node_id, Direction::Upstream)
    }

    /// All transitive successors reachable through *cached* contexts.
    ///
    /// Same traversal rules as [`upstream_chain`](Self::upstream_chain).
    #[must_use]
    pub fn downstream_chain(&self, node_id: &NodeId) -> Vec<NodeId> {
        self.chain(node_id, Direction::Downstream)
    }

    fn chain(&self, start: &NodeId, direction: Direction) -> Vec<NodeId> {
        let state = self.state.lock().unwrap();

        let mut discovered = Vec::new();
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<NodeId> =
            neighbors(&state, start, &direction).iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            discovered.push(id.clone());
            queue.extend(neighbors(&state, &id, &direction).iter().cloned());
        }
        discovered
    }
}

fn neighbors<'a>(state: &'a ManagerState, id: &NodeId, direction: &Direction) -> &'a [NodeId] {
    match state.node_contexts.get(id) {
        Some(ctx) => match direction {
            Direction::Upstream => &ctx.predecessors,
            Direction::Downstream => &ctx.successors,
        },
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(node_id: &str, predecessors: &[&str], successors: &[&str]) -> NodeContext {
        NodeContext {
            node_id: node_id.into(),
            predecessors: predecessors.iter().map(|&p| p.into()).collect(),
            successors: successors.iter().map(|&s| s.into()).collect(),
            ..NodeContext::default()
        }
    }

    struct NoApi;

    #[async_trait::async_trait]
    impl GraphApi for NoApi {
        async fn fetch_graph(&self, _: &WorkflowId) -> Result<WorkflowGraph, ApiError> {
            unreachable!("test never touches the network")
        }

        async fn fetch_node_context(
            &self,
            _: &WorkflowId,
            _: &NodeId,
        ) -> Result<NodeContext, ApiError> {
            unreachable!("test never touches the network")
        }
    }

    fn offline_manager() -> WorkflowGraphManager {
        WorkflowGraphManager::new(Arc::new(NoApi))
    }

    #[test]
    fn chain_follows_cached_contexts_only() {
        let manager = offline_manager();
        // n3 <- n2 <- n1, but only n3 and n2 have cached contexts.
        manager.notify_node_change(&"n3".into(), context("n3", &["n2"], &[]));
        manager.notify_node_change(&"n2".into(), context("n2", &["n1"], &["n3"]));

        let chain = manager.upstream_chain(&"n3".into());
        // n1 is collected as a dead end even though its context is missing.
        assert_eq!(chain, vec![NodeId::from("n2"), NodeId::from("n1")]);
    }

    #[test]
    fn chain_terminates_on_cycles_and_can_rediscover_start() {
        let manager = offline_manager();
        // a -> b -> a cycle in the cached successor lists.
        manager.notify_node_change(&"a".into(), context("a", &["b"], &["b"]));
        manager.notify_node_change(&"b".into(), context("b", &["a"], &["a"]));

        let chain = manager.downstream_chain(&"a".into());
        assert_eq!(chain.len(), 2);
        assert!(chain.contains(&"b".into()));
        // Reached via the cycle, so the start node itself appears.
        assert!(chain.contains(&"a".into()));
    }

    #[test]
    fn chain_of_unknown_node_is_empty() {
        let manager = offline_manager();
        assert!(manager.upstream_chain(&"ghost".into()).is_empty());
        assert!(manager.downstream_chain(&"ghost".into()).is_empty());
    }

    #[test]
    fn depth_distinguishes_roots_from_uncached_nodes() {
        let manager = offline_manager();
        manager.notify_node_change(&"root".into(), context("root", &[], &["n2"]));
        assert_eq!(manager.node_depth(&"root".into()), Some(0));
        assert_eq!(manager.node_depth(&"missing".into()), None);
    }

    #[test]
    fn unsubscribe_removes_only_its_own_registration() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let manager = offline_manager();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_hits = Arc::clone(&first);
        let sub_a = manager.subscribe(
            &"n1".into(),
            Arc::new(move |_| {
                first_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let second_hits = Arc::clone(&second);
        let _sub_b = manager.subscribe(
            &"n1".into(),
            Arc::new(move |_| {
                second_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        manager.unsubscribe(&sub_a);
        manager.notify_node_change(&"n1".into(), context("n1", &[], &[]));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
