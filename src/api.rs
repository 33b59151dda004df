//! Backend API surface consumed by the graph manager.
//!
//! The manager never talks to the network directly; it goes through the
//! [`GraphApi`] trait so pages and tests can inject their own client. The
//! production implementation is [`HttpGraphApi`], a thin reqwest wrapper over
//! the two graph endpoints:
//!
//! - `GET /v1/workflows/{workflow_id}/graph`
//! - `GET /v1/workflows/{workflow_id}/nodes/{node_id}/context`
//!
//! Failures propagate to the caller unchanged. There is no retry, backoff,
//! or timeout enforcement at this layer; page-level code decides what a
//! failed load means for the user.

use async_trait::async_trait;
use thiserror::Error;

use crate::graph::model::{NodeContext, WorkflowGraph};
use crate::types::{NodeId, WorkflowId};

/// Errors surfaced by graph API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure: DNS, connect, TLS, or a dropped body.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status code.
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not the expected JSON shape.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read-only access to a workflow's server-computed dependency graph.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Fetch the whole-graph snapshot for a workflow.
    async fn fetch_graph(&self, workflow_id: &WorkflowId) -> Result<WorkflowGraph, ApiError>;

    /// Fetch a single node's context within a workflow.
    async fn fetch_node_context(
        &self,
        workflow_id: &WorkflowId,
        node_id: &NodeId,
    ) -> Result<NodeContext, ApiError>;
}

/// HTTP implementation of [`GraphApi`] backed by a shared [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct HttpGraphApi {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpGraphApi {
    /// Create a client against the given backend base URL (no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    /// Attach a bearer token sent with every request.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let mut request = self.http.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl GraphApi for HttpGraphApi {
    async fn fetch_graph(&self, workflow_id: &WorkflowId) -> Result<WorkflowGraph, ApiError> {
        let url = format!("{}/v1/workflows/{workflow_id}/graph", self.base_url);
        self.get_json(url).await
    }

    async fn fetch_node_context(
        &self,
        workflow_id: &WorkflowId,
        node_id: &NodeId,
    ) -> Result<NodeContext, ApiError> {
        let url = format!(
            "{}/v1/workflows/{workflow_id}/nodes/{node_id}/context",
            self.base_url
        );
        self.get_json(url).await
    }
}
