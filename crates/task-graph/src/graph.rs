//! Petgraph view over a set of tasks.
//!
//! The canonical task data lives in the caller's records; this module builds
//! a throwaway directed graph (parent -> child) from their `parent_ids` to
//! answer structural questions: does the graph contain a cycle, which nodes
//! form it, and which tasks are upstream of a given task.

use crate::{Error, Result, TaskNodeData};
use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Directed graph of task ids, edges pointing from parent to child.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// The directed graph of task ids.
    graph: DiGraph<String, ()>,
    /// Map from task ids to node indices.
    id_to_node: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Create a new empty task graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from task records, one edge per `parent_ids` entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependencies`] if any task lists a parent id
    /// that is not part of `nodes`.
    pub fn from_nodes<T: TaskNodeData>(nodes: &[T]) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_task(node.id());
        }

        let mut missing = Vec::new();
        for node in nodes {
            for parent in node.parent_ids() {
                if graph.contains_task(parent) {
                    graph.add_edge(parent, node.id())?;
                } else {
                    missing.push((node.id().to_string(), parent.clone()));
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingDependencies { missing });
        }

        Ok(graph)
    }

    /// Add a task node.
    ///
    /// If a task with the same id already exists, returns the existing node index.
    pub fn add_task(&mut self, id: &str) -> NodeIndex {
        if let Some(&node) = self.id_to_node.get(id) {
            return node;
        }

        let node = self.graph.add_node(id.to_string());
        self.id_to_node.insert(id.to_string(), node);
        node
    }

    /// Add a parent -> child edge between two existing tasks.
    ///
    /// Repeated edges are collapsed into one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependency`] if either id is unknown.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let child_idx = self.index_of(child, parent)?;
        let parent_idx = self.index_of(parent, child)?;

        if self.graph.find_edge(parent_idx, child_idx).is_none() {
            self.graph.add_edge(parent_idx, child_idx, ());
        }
        Ok(())
    }

    fn index_of(&self, id: &str, referenced_by: &str) -> Result<NodeIndex> {
        self.id_to_node
            .get(id)
            .copied()
            .ok_or_else(|| Error::MissingDependency {
                task: referenced_by.to_string(),
                dependency: id.to_string(),
            })
    }

    /// Check if the graph has cycles.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Return every cycle in the graph as a list of member ids.
    ///
    /// Each entry is one strongly connected component with more than one
    /// member, or a single task that lists itself as parent.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.find_edge(*single, *single).is_some(),
                _ => true,
            })
            .map(|component| {
                let mut ids: Vec<String> = component
                    .into_iter()
                    .map(|idx| self.graph[idx].clone())
                    .collect();
                ids.sort();
                ids
            })
            .collect()
    }

    /// Describe the cycles of this graph for error messages.
    #[must_use]
    pub fn describe_cycles(&self) -> String {
        let cycles = self.cycles();
        if cycles.is_empty() {
            return "task dependency graph contains cycles".to_string();
        }
        cycles
            .iter()
            .map(|ids| format!("[{}]", ids.join(" -> ")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// All tasks upstream of `id` (its parents, their parents, and so on).
    ///
    /// The task itself is not included unless it sits on a cycle.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let Some(&start) = self.id_to_node.get(id) else {
            return seen;
        };

        let mut frontier = vec![start];
        while let Some(current) = frontier.pop() {
            for parent in self.graph.neighbors_directed(current, Direction::Incoming) {
                if seen.insert(self.graph[parent].clone()) {
                    frontier.push(parent);
                }
            }
        }
        seen
    }

    /// Whether adding `parent_id` as a parent of `task_id` would close a cycle.
    #[must_use]
    pub fn would_create_cycle(&self, task_id: &str, parent_id: &str) -> bool {
        let closes = task_id == parent_id || self.ancestors(parent_id).contains(task_id);
        if closes {
            debug!(task = %task_id, parent = %parent_id, "Rejecting edge that would close a cycle");
        }
        closes
    }

    /// Get the number of tasks in the graph.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if a task exists in the graph.
    #[must_use]
    pub fn contains_task(&self, id: &str) -> bool {
        self.id_to_node.contains_key(id)
    }
}
