//! # Runboard client core
//!
//! Client-side core of the Runboard data-analysis collaboration platform.
//! The backend owns projects, uploads, runs, and the workflow graphs it
//! computes for the pipeline editor; this crate owns the two pieces of the
//! client with real invariants:
//!
//! - [`graph::WorkflowGraphManager`] — session-wide cache of a
//!   server-computed dependency graph with upstream/downstream queries,
//!   memoized per-node contexts, and change notification.
//! - [`realtime::RunChannel`] — one shared WebSocket connection multiplexing
//!   run-status events to per-run subscribers, with a bounded reconnect
//!   policy.
//!
//! Both are plain structs constructed by the application's composition root
//! and shared via `Arc`; there are no module-level globals.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use runboard::api::HttpGraphApi;
//! use runboard::config::Config;
//! use runboard::graph::WorkflowGraphManager;
//! use runboard::realtime::RunChannel;
//!
//! # async fn demo() -> Result<(), runboard::api::ApiError> {
//! runboard::telemetry::init();
//! let config = Config::from_env();
//!
//! let api = Arc::new(HttpGraphApi::new(config.api_base_url.clone()));
//! let manager = Arc::new(WorkflowGraphManager::new(api));
//! let graph = manager.load_graph(&"wf1".into()).await?;
//! println!("execution order: {:?}", graph.execution_order);
//!
//! let channel = Arc::new(RunChannel::new(config.channel_config()));
//! channel.connect();
//! channel.subscribe_to_run(
//!     &"r1".into(),
//!     Arc::new(|payload| println!("run update: {payload}")),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`graph`] - Workflow dependency graph cache and traversal queries
//! - [`realtime`] - Shared reconnecting run-status channel
//! - [`api`] - Backend graph endpoints behind an injectable trait
//! - [`runs`] - Run records and lifecycle states
//! - [`plugins`] - Static registry for guided-conversion wizards
//! - [`config`] - Environment-driven client configuration
//! - [`telemetry`] - Tracing subscriber setup

pub mod api;
pub mod config;
pub mod graph;
pub mod plugins;
pub mod realtime;
pub mod runs;
pub mod telemetry;
pub mod types;
