//! Core identifier types for the Runboard client.
//!
//! The backend owns all identity: workflow, node, run, and project ids are
//! opaque strings minted server-side. This module wraps them in transparent
//! newtypes so the graph cache and the realtime channel cannot mix them up.
//!
//! # Examples
//!
//! ```rust
//! use runboard::types::{NodeId, RunId};
//!
//! let node: NodeId = "n1".into();
//! assert_eq!(node.as_str(), "n1");
//! assert_eq!(node.to_string(), "n1");
//!
//! let run = RunId::from("r42");
//! assert_ne!(run.as_str(), "r1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        // Developer experience: allow string literals where an id is expected.
        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

id_type! {
    /// Identifies a workflow (a node-based analysis pipeline).
    WorkflowId
}

id_type! {
    /// Identifies a processing node within a workflow. Unique per workflow.
    NodeId
}

id_type! {
    /// Identifies an analysis run submitted for execution.
    RunId
}

id_type! {
    /// Identifies a project owning uploads, runs, and discussions.
    ProjectId
}
