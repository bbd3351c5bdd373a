//! Project snapshot files.
//!
//! A snapshot is the JSON document holding everything a [`Session`] edits,
//! so the CLI can load a project, apply one operation and write it back.
//!
//! [`Session`]: crate::Session

use crate::model::{ExecutionEvaluator, ExecutionState, PrimitiveTask, SelectStrategy, SemanticTask};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serialized state of one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Primitive tasks in hierarchy order.
    #[serde(default)]
    pub primitive_tasks: Vec<PrimitiveTask>,
    /// Semantic decomposition tree.
    #[serde(default)]
    pub semantic_tasks: Vec<SemanticTask>,
    /// Evaluators in store order.
    #[serde(default)]
    pub evaluators: Vec<ExecutionEvaluator>,
    /// Last execution flags received from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_state: Option<BTreeMap<String, ExecutionState>>,
    /// Tree-search selection strategy.
    #[serde(default)]
    pub select_strategy: SelectStrategy,
}

impl ProjectSnapshot {
    /// Load a snapshot from a JSON file.
    ///
    /// Returns an empty snapshot if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No snapshot yet, starting empty");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read project snapshot"))?;

        serde_json::from_str(&content).map_err(|e| {
            Error::serialization(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Save the snapshot as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::io(e, Some(parent.to_path_buf()), "create snapshot directory")
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "write project snapshot"))
    }
}
