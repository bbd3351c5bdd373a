//! Validation utilities for task graphs.
//!
//! This module checks the structural invariants that every task set must
//! satisfy between mutations: references resolve, adjacency is recorded on
//! both ends, and the parent relation is acyclic.

use crate::{Error, TaskGraph, TaskNodeData};
use std::collections::HashMap;

/// Result of graph validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the graph is valid.
    pub is_valid: bool,
    /// List of validation errors, if any.
    pub errors: Vec<Error>,
}

impl ValidationResult {
    /// Create a valid result.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create an invalid result with errors.
    #[must_use]
    pub fn invalid(errors: Vec<Error>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Validate a task set.
///
/// Checks for:
/// - References in `parent_ids` or `children` to unknown tasks
/// - Links recorded on only one side (`B ∈ A.parent_ids` without `A ∈ B.children`, or the reverse)
/// - Cycles in the parent relation
#[must_use]
pub fn validate<T: TaskNodeData>(nodes: &[T]) -> ValidationResult {
    let by_id: HashMap<&str, &T> = nodes.iter().map(|node| (node.id(), node)).collect();
    let mut errors = Vec::new();
    let mut missing = Vec::new();

    for node in nodes {
        for parent_id in node.parent_ids() {
            match by_id.get(parent_id.as_str()) {
                Some(parent) if !parent.children().iter().any(|c| c == node.id()) => {
                    errors.push(Error::AsymmetricAdjacency {
                        parent: parent_id.clone(),
                        child: node.id().to_string(),
                    });
                }
                Some(_) => {}
                None => missing.push((node.id().to_string(), parent_id.clone())),
            }
        }
        for child_id in node.children() {
            match by_id.get(child_id.as_str()) {
                Some(child) if !child.parent_ids().iter().any(|p| p == node.id()) => {
                    errors.push(Error::AsymmetricAdjacency {
                        parent: node.id().to_string(),
                        child: child_id.clone(),
                    });
                }
                Some(_) => {}
                None => missing.push((node.id().to_string(), child_id.clone())),
            }
        }
    }

    if !missing.is_empty() {
        errors.push(Error::MissingDependencies { missing });
    }

    let mut graph = TaskGraph::new();
    for node in nodes {
        graph.add_task(node.id());
    }
    for node in nodes {
        for parent_id in node.parent_ids() {
            if graph.contains_task(parent_id) {
                let _ = graph.add_edge(parent_id, node.id());
            }
        }
    }
    if graph.has_cycles() {
        errors.push(Error::CycleDetected {
            message: graph.describe_cycles(),
        });
    }

    if errors.is_empty() {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(errors)
    }
}
