//! Error types for task graph operations.

use std::fmt;

/// Result type for task graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during task graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A dependency cycle was detected in the graph.
    CycleDetected {
        /// Human-readable description of the cycle.
        message: String,
    },

    /// A task references another task that doesn't exist.
    MissingDependency {
        /// The task holding the dangling reference.
        task: String,
        /// The id that could not be found.
        dependency: String,
    },

    /// Multiple dangling references were found.
    MissingDependencies {
        /// List of (task, missing_dependency) pairs.
        missing: Vec<(String, String)>,
    },

    /// A parent/child link is recorded on one side only.
    AsymmetricAdjacency {
        /// The task listed as parent.
        parent: String,
        /// The task listed as child.
        child: String,
    },

    /// Failed to perform topological sort.
    TopologicalSortFailed {
        /// Reason for the failure.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleDetected { message } => {
                write!(f, "Cycle detected in task graph: {message}")
            }
            Self::MissingDependency { task, dependency } => {
                write!(f, "Task '{task}' references missing task '{dependency}'")
            }
            Self::MissingDependencies { missing } => {
                let list = missing
                    .iter()
                    .map(|(task, dep)| format!("Task '{task}' references missing task '{dep}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Missing dependencies: {list}")
            }
            Self::AsymmetricAdjacency { parent, child } => {
                write!(
                    f,
                    "Adjacency mismatch between parent '{parent}' and child '{child}'"
                )
            }
            Self::TopologicalSortFailed { reason } => {
                write!(f, "Failed to sort tasks topologically: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}
