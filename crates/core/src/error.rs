//! Error types for taskweave-core.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for taskweave-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for taskweave-core operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Structural invariant violation in the task graph (cycle, dangling
    /// reference, one-sided adjacency). Never recovered locally.
    #[error("Task graph invariant violated: {0}")]
    #[diagnostic(code(taskweave_core::graph::invariant))]
    Graph(#[from] taskweave_task_graph::Error),

    /// A requested parent edge would close a cycle.
    #[error("Adding '{parent}' as a parent of '{task}' would create a cycle")]
    #[diagnostic(
        code(taskweave_core::graph::cycle),
        help("Remove the path leading from the task back to the parent first")
    )]
    WouldCreateCycle {
        /// The task that would receive the parent.
        task: String,
        /// The rejected parent id.
        parent: String,
    },

    /// The sync backend could not be reached or answered with an error.
    #[error("Sync with backend failed: {message}")]
    #[diagnostic(code(taskweave_core::sync::failed))]
    Sync {
        /// The error message describing the transport failure
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(taskweave_core::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(taskweave_core::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(taskweave_core::serialization))]
    Serialization {
        /// The error message describing the serialization issue
        message: String,
    },
}

impl Error {
    /// Create a sync error with a message
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }

    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }

    /// Create a serialization error with a message
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_wraps_cycle() {
        let err: Error = taskweave_task_graph::Error::CycleDetected {
            message: "[a -> b]".to_string(),
        }
        .into();
        assert!(err.to_string().contains("[a -> b]"));
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            Some(PathBuf::from("/tmp/snapshot.json")),
            "read snapshot",
        );
        match err {
            Error::Io {
                path, operation, ..
            } => {
                assert_eq!(path.as_deref(), Some(Path::new("/tmp/snapshot.json")));
                assert_eq!(operation, "read snapshot");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_would_create_cycle_message() {
        let err = Error::WouldCreateCycle {
            task: "a".to_string(),
            parent: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Adding 'b' as a parent of 'a' would create a cycle"
        );
    }
}
