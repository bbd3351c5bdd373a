//! Primitive task store.
//!
//! Holds the executable task DAG in hierarchy order. Every structural
//! mutation keeps `parentIds` and `children` mirrored, re-sorts the tasks
//! and re-derives `existing_keys`.

use crate::model::{PrimitiveTask, ROOT_ID, push_unique};
use crate::prompt;
use crate::{Error, Result};
use taskweave_task_graph::{TaskGraph, sort_by_hierarchy};
use tracing::debug;
use uuid::Uuid;

/// Ordered collection of primitive tasks with an explicit root reference.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveTaskStore {
    tasks: Vec<PrimitiveTask>,
    root_id: Option<String>,
    inspected: Option<String>,
}

impl PrimitiveTaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from tasks loaded from the backend or a snapshot.
    #[must_use]
    pub fn from_tasks(tasks: Vec<PrimitiveTask>) -> Self {
        let mut store = Self::new();
        store.replace(tasks);
        store
    }

    /// Tasks in hierarchy order.
    #[must_use]
    pub fn tasks(&self) -> &[PrimitiveTask] {
        &self.tasks
    }

    /// Look up a task by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PrimitiveTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Index of a task in hierarchy order.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Number of tasks, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the store holds no task at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Id of the designated root task, if one exists.
    #[must_use]
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// Id of the task currently selected for inspection.
    #[must_use]
    pub fn inspected(&self) -> Option<&str> {
        self.inspected.as_deref()
    }

    /// Select a task for inspection. Unknown ids clear the selection.
    pub fn inspect(&mut self, id: Option<&str>) {
        self.inspected = id.filter(|id| self.get(id).is_some()).map(str::to_string);
    }

    fn is_root(&self, id: &str) -> bool {
        self.root_id.as_deref() == Some(id)
    }

    /// Swap in a canonical task array.
    ///
    /// The root is recognized by its wire id at this boundary only.
    pub fn replace(&mut self, tasks: Vec<PrimitiveTask>) {
        self.root_id = tasks
            .iter()
            .find(|t| t.id == ROOT_ID)
            .map(|t| t.id.clone());
        self.tasks = tasks;
        if let Some(id) = self.inspected.take() {
            self.inspect(Some(&id));
        }
    }

    /// Append a placeholder task, creating the root first when the store is
    /// empty. Returns the new task's id.
    pub fn add_task(&mut self) -> String {
        if self.tasks.is_empty() {
            let root = PrimitiveTask::root();
            self.root_id = Some(root.id.clone());
            self.tasks.push(root);
        }
        let id = Uuid::new_v4().to_string();
        self.tasks.push(PrimitiveTask::placeholder(id.clone()));
        debug!(task = %id, "Added primitive task");
        id
    }

    /// Remove a task and every reference to it.
    ///
    /// Returns `Ok(false)` when the id is unknown.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.position(id) else {
            debug!(task = %id, "Delete of unknown primitive task ignored");
            return Ok(false);
        };
        self.tasks.remove(index);
        for task in &mut self.tasks {
            task.parent_ids.retain(|p| p != id);
            task.children.retain(|c| c != id);
        }
        if self.inspected.as_deref() == Some(id) {
            self.inspected = None;
        }
        if self.is_root(id) {
            self.root_id = None;
        }
        self.reorder()?;
        Ok(true)
    }

    /// Make `parent_id` a parent of `task_id`.
    ///
    /// Returns `Ok(false)` when either id is unknown or the edge already
    /// exists, and [`Error::WouldCreateCycle`] without touching the store
    /// when the edge would close a cycle.
    pub fn add_parent(&mut self, task_id: &str, parent_id: &str) -> Result<bool> {
        let (Some(child), Some(parent)) = (self.position(task_id), self.position(parent_id)) else {
            debug!(task = %task_id, parent = %parent_id, "add_parent on unknown task ignored");
            return Ok(false);
        };
        if self.tasks[child].parent_ids.iter().any(|p| p == parent_id) {
            return Ok(false);
        }
        if TaskGraph::from_nodes(&self.tasks)?.would_create_cycle(task_id, parent_id) {
            return Err(Error::WouldCreateCycle {
                task: task_id.to_string(),
                parent: parent_id.to_string(),
            });
        }

        self.tasks[child].parent_ids.push(parent_id.to_string());
        push_unique(&mut self.tasks[parent].children, task_id);
        self.reorder()?;
        Ok(true)
    }

    /// Remove the edge `parent_id -> task_id` from both sides.
    ///
    /// Returns `Ok(false)` when there was no such edge.
    pub fn remove_parent(&mut self, task_id: &str, parent_id: &str) -> Result<bool> {
        let Some(child) = self.position(task_id) else {
            debug!(task = %task_id, "remove_parent on unknown task ignored");
            return Ok(false);
        };
        let before = self.tasks[child].parent_ids.len();
        self.tasks[child].parent_ids.retain(|p| p != parent_id);
        if self.tasks[child].parent_ids.len() == before {
            return Ok(false);
        }
        if let Some(parent) = self.position(parent_id) {
            self.tasks[parent].children.retain(|c| c != task_id);
        }
        self.reorder()?;
        Ok(true)
    }

    fn reorder(&mut self) -> Result<()> {
        self.sort_nodes_by_hierarchy()?;
        self.collect_input_keys();
        Ok(())
    }

    /// Reorder the tasks so every task follows all of its parents.
    ///
    /// Fails with the graph's cycle error, leaving the order untouched.
    pub fn sort_nodes_by_hierarchy(&mut self) -> Result<()> {
        self.tasks = sort_by_hierarchy(self.tasks.clone())?;
        debug!(tasks = self.tasks.len(), "Sorted primitive tasks by hierarchy");
        Ok(())
    }

    /// Derive `existing_keys` for every non-root task from the keys read and
    /// produced by the tasks before it.
    ///
    /// Does nothing while any non-root task still lacks an execution.
    pub fn collect_input_keys(&mut self) {
        let root_id = self.root_id.clone();
        let not_root = |task: &PrimitiveTask| root_id.as_deref() != Some(task.id.as_str());

        if self
            .tasks
            .iter()
            .any(|t| not_root(t) && t.execution.is_none())
        {
            debug!("Skipping key collection: unconfigured tasks present");
            return;
        }

        let mut keys: Vec<String> = Vec::new();
        for task in &mut self.tasks {
            if !not_root(task) {
                continue;
            }
            task.existing_keys = keys.clone();
            for key in &task.doc_input_keys {
                push_unique(&mut keys, key);
            }
            if let Some(key) = &task.state_output_key {
                push_unique(&mut keys, key);
            }
        }
    }

    /// Replace the task with the same id. Returns `false` on a lookup miss.
    pub fn replace_task(&mut self, id: &str, task: PrimitiveTask) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => {
                debug!(task = %id, "Replace of unknown primitive task ignored");
                false
            }
        }
    }

    /// Copy of the task with a new output key.
    #[must_use]
    pub fn with_output_key(&self, id: &str, key: &str) -> Option<PrimitiveTask> {
        let mut task = self.get(id)?.clone();
        task.state_output_key = Some(key.to_string());
        Some(task)
    }

    /// Copy of the task with new input keys.
    ///
    /// Prompt tools get their user message regenerated; other tools are
    /// flagged for parameter recompilation.
    #[must_use]
    pub fn with_doc_input_keys(&self, id: &str, keys: Vec<String>) -> Option<PrimitiveTask> {
        let mut task = self.get(id)?.clone();
        task.doc_input_keys = keys;
        match task.execution.as_mut() {
            Some(execution) if execution.is_prompt_tool() => {
                prompt::apply_to_parameters(&mut execution.parameters, &task.doc_input_keys);
            }
            _ => {
                task.recompile_needed_parameters = true;
                task.recompile_needed_io = false;
            }
        }
        Some(task)
    }
}
