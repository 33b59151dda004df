//! Analysis run records as consumed from the backend.
//!
//! Runs are created server-side when an analysis is submitted and move
//! through their lifecycle there; the client only reads them, either from
//! REST responses or from payloads pushed over the realtime channel. The one
//! mutation path is asking the backend to cancel or delete a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ProjectId, RunId};

/// Lifecycle state of an analysis run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl RunStatus {
    /// Terminal states: the backend will push no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Canceled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
        };
        write!(f, "{label}")
    }
}

/// One analysis execution, owned by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub project_id: ProjectId,
    pub status: RunStatus,
    pub task_name: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Number of image artifacts generated so far.
    #[serde(default)]
    pub image_count: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}
