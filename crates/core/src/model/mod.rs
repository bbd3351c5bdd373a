//! Wire-compatible data model.
//!
//! Field names follow the JSON the backend exchanges (`parentIds`,
//! `recompile_needed_IO`, `MCT_id`, ...); Rust field names are snake_case and
//! mapped with `serde(rename)`.

mod evaluator;
mod primitive;
mod semantic;

pub use evaluator::{EvaluatorParameters, ExecutionEvaluator, PromptMessage};
pub use primitive::{Execution, PROMPT_TOOL, PrimitiveTask};
pub use semantic::{Evaluation, SelectStrategy, SemanticTask};

use serde::{Deserialize, Serialize};

/// Wire id of the implicit root task.
///
/// Stores track the root through an explicit reference; this constant only
/// exists so the backend keeps recognizing the node it created.
pub const ROOT_ID: &str = "-1";

/// Server-reported execution flags for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// All inputs are available, so the task can run.
    pub executable: bool,
    /// The task has run and its output is available.
    pub executed: bool,
}

/// Append `key` to `keys` unless already present.
pub(crate) fn push_unique(keys: &mut Vec<String>, key: &str) {
    if !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
    }
}
