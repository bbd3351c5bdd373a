//! Traversal algorithms for task graphs.
//!
//! Ordering uses Kahn's algorithm driven by the tasks' own adjacency lists:
//! the in-degree of a task is the number of distinct `parent_ids`, and a task
//! is released once every parent that lists it among its `children` has been
//! emitted. Ties are broken by input order, so re-sorting an already sorted
//! set leaves it unchanged.

use crate::{Error, Result, TaskGraph, TaskNodeData};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Groups of task ids ordered by dependency depth.
///
/// Every task in group N has all of its parents in groups `0..N`.
pub type DependencyLevels = Vec<Vec<String>>;

/// Compute a topological order of `nodes`, returned as indices into the slice.
///
/// # Errors
///
/// - [`Error::MissingDependencies`] if a task lists an unknown parent
/// - [`Error::CycleDetected`] if the parent relation contains a cycle
/// - [`Error::TopologicalSortFailed`] if `children` lists do not mirror
///   `parent_ids`, leaving some tasks unreachable
pub fn topological_order<T: TaskNodeData>(nodes: &[T]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id(), i))
        .collect();

    let mut missing = Vec::new();
    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|node| {
            let parents: HashSet<&str> = node.parent_ids().iter().map(String::as_str).collect();
            for parent in &parents {
                if !index.contains_key(parent) {
                    missing.push((node.id().to_string(), (*parent).to_string()));
                }
            }
            parents.len()
        })
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingDependencies { missing });
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        let current_id = nodes[current].id();

        let mut released = HashSet::new();
        for child in nodes[current].children() {
            if !released.insert(child.as_str()) {
                continue;
            }
            let Some(&child_idx) = index.get(child.as_str()) else {
                continue;
            };
            let listed_as_parent = nodes[child_idx]
                .parent_ids()
                .iter()
                .any(|parent| parent == current_id);
            if !listed_as_parent || in_degree[child_idx] == 0 {
                continue;
            }

            in_degree[child_idx] -= 1;
            if in_degree[child_idx] == 0 {
                queue.push_back(child_idx);
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(unsortable(nodes, &order));
    }

    Ok(order)
}

fn unsortable<T: TaskNodeData>(nodes: &[T], order: &[usize]) -> Error {
    match TaskGraph::from_nodes(nodes) {
        Ok(graph) if graph.has_cycles() => Error::CycleDetected {
            message: graph.describe_cycles(),
        },
        Ok(_) => {
            let emitted: HashSet<usize> = order.iter().copied().collect();
            let stuck = nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| !emitted.contains(i))
                .map(|(_, node)| node.id())
                .collect::<Vec<_>>()
                .join(", ");
            Error::TopologicalSortFailed {
                reason: format!("children lists do not mirror parentIds for: {stuck}"),
            }
        }
        Err(err) => err,
    }
}

/// Reorder `nodes` so that every task comes after all of its parents.
///
/// # Errors
///
/// See [`topological_order`].
pub fn sort_by_hierarchy<T: TaskNodeData>(nodes: Vec<T>) -> Result<Vec<T>> {
    let order = topological_order(&nodes)?;
    debug!("Sorted {} tasks by hierarchy", order.len());

    let mut slots: Vec<Option<T>> = nodes.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|idx| slots.get_mut(idx).and_then(Option::take))
        .collect())
}

/// Group tasks by dependency depth.
///
/// Level 0 holds tasks without parents; a task's level is one more than
/// the deepest of its parents. Within a level, tasks keep topological order.
///
/// # Errors
///
/// See [`topological_order`].
pub fn dependency_levels<T: TaskNodeData>(nodes: &[T]) -> Result<DependencyLevels> {
    let order = topological_order(nodes)?;

    let mut levels: DependencyLevels = vec![];
    let mut processed: HashMap<&str, usize> = HashMap::new();

    for idx in order {
        let node = &nodes[idx];
        let level = node
            .parent_ids()
            .iter()
            .filter_map(|parent| processed.get(parent.as_str()))
            .map(|parent_level| parent_level + 1)
            .max()
            .unwrap_or(0);

        if level >= levels.len() {
            levels.resize(level + 1, vec![]);
        }
        levels[level].push(node.id().to_string());
        processed.insert(node.id(), level);
    }

    Ok(levels)
}
