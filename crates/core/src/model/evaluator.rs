use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One chat message of a prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message role (`system`, `human`, ...).
    pub role: String,
    /// Message body, with `{key}` placeholders for state keys.
    pub content: String,
}

/// LLM settings of an evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorParameters {
    /// Display name of the evaluation prompt.
    #[serde(default)]
    pub name: String,
    /// Model identifier.
    #[serde(default)]
    pub model: String,
    /// Expected response format.
    #[serde(default)]
    pub format: String,
    /// Chat template rendered by the backend.
    #[serde(default)]
    pub prompt_template: Vec<PromptMessage>,
}

/// A named scoring rule bound to one primitive task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvaluator {
    /// Unique evaluator name.
    pub name: String,
    /// What the evaluator checks.
    #[serde(default)]
    pub definition: String,
    /// Id of the primitive task whose output is scored.
    pub task: String,
    /// First evaluator for its task in store order.
    #[serde(rename = "isRoot", default)]
    pub is_root: bool,
    /// Backend recommendation attached to the evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// State key the evaluator reads as its main input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_input_key: Option<String>,
    /// Keys the evaluator reads; always a subset of `existing_keys`.
    #[serde(default)]
    pub doc_input_keys: Vec<String>,
    /// Keys the target task exposes to its evaluators.
    #[serde(default)]
    pub existing_keys: Vec<String>,
    /// Name under which the evaluation result is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_output_key: Option<String>,
    /// Scores the evaluator may return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_scores: Option<Vec<Value>>,
    /// LLM settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<EvaluatorParameters>,
}

impl ExecutionEvaluator {
    /// Create an evaluator with only the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task: task.into(),
            ..Self::default()
        }
    }
}
