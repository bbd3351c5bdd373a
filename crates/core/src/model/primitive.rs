use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskweave_task_graph::TaskNodeData;

use super::ROOT_ID;

/// Tool name whose parameters carry a chat prompt template.
pub const PROMPT_TOOL: &str = "prompt_tool";

/// Tool binding of a primitive task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Name of the tool that executes the task.
    pub tool: String,
    /// Tool-specific parameters, passed through to the backend untouched
    /// except for the prompt template of [`PROMPT_TOOL`].
    #[serde(default)]
    pub parameters: Value,
}

impl Execution {
    /// Whether this execution renders a prompt from the task's input keys.
    #[must_use]
    pub fn is_prompt_tool(&self) -> bool {
        self.tool == PROMPT_TOOL
    }
}

/// A node in the executable task DAG.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveTask {
    /// Unique task id.
    pub id: String,
    /// Short display label.
    pub label: String,
    /// What the task does.
    #[serde(default)]
    pub description: String,
    /// Display text explaining why the task exists.
    #[serde(default)]
    pub explanation: String,
    /// Free-text id of the semantic task this task addresses.
    #[serde(default)]
    pub solves: String,
    /// Declared predecessors.
    #[serde(rename = "parentIds", default)]
    pub parent_ids: Vec<String>,
    /// Declared successors, the inverse of `parent_ids`.
    #[serde(default)]
    pub children: Vec<String>,
    /// Tool binding; `None` until the task has been configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<Execution>,
    /// State key the task reads as its main input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_input_key: Option<String>,
    /// Name under which the task's result is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_output_key: Option<String>,
    /// Keys the task reads.
    #[serde(default)]
    pub doc_input_keys: Vec<String>,
    /// Every key produced or read before this task in hierarchy order.
    #[serde(default)]
    pub existing_keys: Vec<String>,
    /// Inputs or outputs changed since the last compilation.
    #[serde(rename = "recompile_needed_IO", default)]
    pub recompile_needed_io: bool,
    /// Tool parameters changed since the last compilation.
    #[serde(default)]
    pub recompile_needed_parameters: bool,
}

impl PrimitiveTask {
    /// A freshly added, not yet configured task.
    #[must_use]
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: "New Task".to_string(),
            description: "New Task Description".to_string(),
            explanation: "N/A".to_string(),
            ..Self::default()
        }
    }

    /// The synthesized root task.
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            label: "Root".to_string(),
            description: "Root".to_string(),
            explanation: "N/A".to_string(),
            ..Self::default()
        }
    }
}

impl TaskNodeData for PrimitiveTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_ids(&self) -> &[String] {
        &self.parent_ids
    }

    fn children(&self) -> &[String] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_backend_payload() {
        let task: PrimitiveTask = serde_json::from_value(json!({
            "id": "t1",
            "label": "Embed",
            "description": "Embed documents",
            "explanation": "N/A",
            "solves": "s1",
            "parentIds": ["-1"],
            "children": [],
            "execution": { "tool": "embedding_tool", "parameters": { "model": "small" } },
            "state_output_key": "embeddings",
            "doc_input_keys": ["documents"],
            "recompile_needed_IO": true
        }))
        .unwrap();

        assert_eq!(task.parent_ids, vec!["-1"]);
        assert_eq!(task.state_output_key.as_deref(), Some("embeddings"));
        assert!(task.recompile_needed_io);
        assert!(!task.recompile_needed_parameters);
        assert!(task.existing_keys.is_empty());
        assert!(!task.execution.unwrap().is_prompt_tool());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let value = serde_json::to_value(PrimitiveTask::placeholder("x")).unwrap();
        assert!(value.get("parentIds").is_some());
        assert!(value.get("recompile_needed_IO").is_some());
        assert!(value.get("execution").is_none());
        assert_eq!(value["label"], "New Task");
    }

    #[test]
    fn test_minimal_payload_defaults() {
        let task: PrimitiveTask =
            serde_json::from_value(json!({ "id": "a", "label": "A" })).unwrap();
        assert!(task.parent_ids.is_empty());
        assert!(task.doc_input_keys.is_empty());
        assert_eq!(task.execution, None);
    }
}
