//! Semantic decomposition tree.
//!
//! Same adjacency bookkeeping as the primitive store, without ordering,
//! key derivation or backend sync.

use crate::model::{ROOT_ID, SelectStrategy, SemanticTask, push_unique};
use tracing::debug;
use uuid::Uuid;

/// Semantic tasks plus the tree-search strategy chosen by the user.
#[derive(Debug, Clone, Default)]
pub struct SemanticPlanStore {
    tasks: Vec<SemanticTask>,
    root_id: Option<String>,
    select_strategy: SelectStrategy,
}

impl SemanticPlanStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from loaded tasks.
    #[must_use]
    pub fn from_tasks(tasks: Vec<SemanticTask>, select_strategy: SelectStrategy) -> Self {
        let root_id = tasks
            .iter()
            .find(|t| t.id == ROOT_ID)
            .map(|t| t.id.clone());
        Self {
            tasks,
            root_id,
            select_strategy,
        }
    }

    /// Tasks in insertion order.
    #[must_use]
    pub fn tasks(&self) -> &[SemanticTask] {
        &self.tasks
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SemanticTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Id of the designated root task, if one exists.
    #[must_use]
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// Current node selection strategy.
    #[must_use]
    pub fn select_strategy(&self) -> SelectStrategy {
        self.select_strategy
    }

    /// Change the node selection strategy.
    pub fn set_select_strategy(&mut self, strategy: SelectStrategy) {
        self.select_strategy = strategy;
    }

    /// Append a placeholder task, creating the root first when empty.
    pub fn add_task(&mut self) -> String {
        if self.tasks.is_empty() {
            let root = SemanticTask::root();
            self.root_id = Some(root.id.clone());
            self.tasks.push(root);
        }
        let id = Uuid::new_v4().to_string();
        self.tasks.push(SemanticTask::placeholder(id.clone()));
        id
    }

    /// Remove a task and repair both neighbor sides. Returns `false` on a
    /// lookup miss.
    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            debug!(task = %id, "Delete of unknown semantic task ignored");
            return false;
        }
        for task in &mut self.tasks {
            task.parent_ids.retain(|p| p != id);
            task.children.retain(|c| c != id);
        }
        if self.root_id.as_deref() == Some(id) {
            self.root_id = None;
        }
        true
    }

    /// Link `parent_id` as a parent of `task_id` on both sides.
    pub fn add_parent(&mut self, task_id: &str, parent_id: &str) -> bool {
        let child = self.tasks.iter().position(|t| t.id == task_id);
        let parent = self.tasks.iter().position(|t| t.id == parent_id);
        let (Some(child), Some(parent)) = (child, parent) else {
            debug!(task = %task_id, parent = %parent_id, "add_parent on unknown semantic task ignored");
            return false;
        };
        if child == parent || self.tasks[child].parent_ids.iter().any(|p| p == parent_id) {
            return false;
        }
        self.tasks[child].parent_ids.push(parent_id.to_string());
        push_unique(&mut self.tasks[parent].children, task_id);
        true
    }
}
