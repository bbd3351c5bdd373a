//! Backend sync abstraction.
//!
//! After a structural mutation the [`Session`](crate::Session) sends every
//! primitive task to a [`SyncBackend`], which answers with the canonical
//! task array and the current execution flags. The HTTP implementation
//! lives in `taskweave-http`; [`LocalBackend`] echoes the tasks back and is
//! used when no server is configured.

use crate::Result;
use crate::model::{ExecutionState, PrimitiveTask};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a sync request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Every primitive task, in hierarchy order.
    pub primitive_tasks: Vec<PrimitiveTask>,
    /// Id of the editing session.
    pub session_id: String,
}

/// Body of a sync response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Canonical task array, replacing the local one.
    pub primitive_tasks: Vec<PrimitiveTask>,
    /// Execution flags per task id, when the backend computed them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_state: Option<BTreeMap<String, ExecutionState>>,
}

/// How a sync round-trip ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The response replaced local state.
    Applied,
    /// A newer request was issued meanwhile; the response was dropped.
    Stale,
    /// The backend failed; local state was kept.
    Failed,
    /// The mutation did not ask for a sync.
    NotRequested,
    /// The mutation was a no-op, so nothing was sent.
    Skipped,
}

/// Trait for sync backends
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Send the task array and return the backend's canonical view.
    async fn update_primitive_tasks(&self, request: UpdateRequest) -> Result<UpdateResponse>;

    /// Get the name of the backend
    fn name(&self) -> &'static str;
}

/// Offline backend - returns the submitted tasks unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create a local backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SyncBackend for LocalBackend {
    async fn update_primitive_tasks(&self, request: UpdateRequest) -> Result<UpdateResponse> {
        tracing::debug!(
            tasks = request.primitive_tasks.len(),
            backend = "local",
            "Echoing primitive tasks"
        );
        Ok(UpdateResponse {
            primitive_tasks: request.primitive_tasks,
            execution_state: None,
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
