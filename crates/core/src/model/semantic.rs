use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use taskweave_task_graph::TaskNodeData;

use super::ROOT_ID;

/// Likert-style scores for one semantic task, with a rationale per criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Evaluation {
    /// How hard the task is to carry out.
    pub complexity: u8,
    /// How well the task fits with its siblings and parent.
    pub coherence: u8,
    /// How much the task contributes to the goal.
    pub importance: u8,
    /// Rationale for `complexity`.
    pub complexity_reason: String,
    /// Rationale for `coherence`.
    pub coherence_reason: String,
    /// Rationale for `importance`.
    pub importance_reason: String,
}

/// Node selection strategy of the remote tree search.
///
/// Stored and sent to the backend; never interpreted locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectStrategy {
    /// Upper Confidence bound applied to Trees.
    #[default]
    #[serde(rename = "UCT")]
    Uct,
    /// Always follow the best-valued child.
    #[serde(rename = "greedy")]
    Greedy,
}

impl fmt::Display for SelectStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uct => "UCT",
            Self::Greedy => "greedy",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SelectStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uct" => Ok(Self::Uct),
            "greedy" => Ok(Self::Greedy),
            _ => Err(format!("Unknown select strategy: {s}")),
        }
    }
}

/// A conceptual node of the decomposition tree, with search bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticTask {
    /// Unique task id.
    pub id: String,
    /// Short display label.
    pub label: String,
    /// What the task is about.
    #[serde(default)]
    pub description: String,
    /// Why the task is part of the decomposition.
    #[serde(default)]
    pub explanation: String,
    /// Declared predecessors.
    #[serde(rename = "parentIds", default)]
    pub parent_ids: Vec<String>,
    /// Declared successors, the inverse of `parent_ids`.
    #[serde(default)]
    pub children: Vec<String>,
    /// Finer-grained refinement of this task, if decomposed further.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_tasks: Option<Vec<SemanticTask>>,
    /// Id of the search-tree node this task came from.
    #[serde(rename = "MCT_id", default)]
    pub mct_id: String,
    /// Id of the parent search-tree node.
    #[serde(rename = "MCT_parent_id", default)]
    pub mct_parent_id: String,
    /// Ids of the child search-tree nodes.
    #[serde(rename = "MCT_children_ids", default)]
    pub mct_children_ids: Vec<String>,
    /// Created by the latest expansion.
    #[serde(default)]
    pub new_node: bool,
    /// Depth in the search tree.
    #[serde(default)]
    pub level: u32,
    /// Accumulated reward.
    #[serde(default)]
    pub value: f64,
    /// Visit count.
    #[serde(default)]
    pub visits: u32,
    /// Reward of the path ending at this node.
    #[serde(default)]
    pub path_value: f64,
    /// Scores assigned by the model.
    #[serde(default)]
    pub llm_evaluation: Evaluation,
    /// Scores assigned by the user.
    #[serde(default)]
    pub user_evaluation: Evaluation,
}

impl SemanticTask {
    /// A freshly added semantic task.
    #[must_use]
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            mct_id: id.clone(),
            id,
            label: "New Task".to_string(),
            description: "New Task Description".to_string(),
            explanation: "N/A".to_string(),
            new_node: true,
            ..Self::default()
        }
    }

    /// The synthesized root of the decomposition tree.
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            mct_id: ROOT_ID.to_string(),
            label: "Root".to_string(),
            description: "Root".to_string(),
            explanation: "N/A".to_string(),
            ..Self::default()
        }
    }
}

impl TaskNodeData for SemanticTask {
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
