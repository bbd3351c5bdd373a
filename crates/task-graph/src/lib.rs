//! Task DAG algorithms for taskweave.
//!
//! Tasks in taskweave carry their adjacency inline: every node lists the ids
//! of its predecessors (`parentIds`) and successors (`children`). This crate
//! works directly on slices of such nodes and provides:
//!
//! - [`sort_by_hierarchy`]: Kahn ordering that keeps input order among peers
//! - [`dependency_levels`]: groups of nodes whose parents all sit in earlier groups
//! - [`TaskGraph`]: a petgraph view used for cycle reporting and reachability
//! - [`validate`]: adjacency symmetry, dangling references and cycle checks
//!
//! # Example
//!
//! ```ignore
//! use taskweave_task_graph::{TaskNodeData, sort_by_hierarchy};
//!
//! struct Node {
//!     id: String,
//!     parents: Vec<String>,
//!     children: Vec<String>,
//! }
//!
//! impl TaskNodeData for Node {
//!     fn id(&self) -> &str { &self.id }
//!     fn parent_ids(&self) -> &[String] { &self.parents }
//!     fn children(&self) -> &[String] { &self.children }
//! }
//!
//! let sorted = sort_by_hierarchy(nodes)?;
//! ```

mod error;
mod graph;
mod traversal;
mod validation;

pub use error::{Error, Result};
pub use graph::TaskGraph;
pub use traversal::{DependencyLevels, dependency_levels, sort_by_hierarchy, topological_order};
pub use validation::{ValidationResult, validate};

/// Trait for task records that carry their own adjacency lists.
///
/// `parent_ids` and `children` are expected to be inverse relations of each
/// other; [`validate`] reports where they are not.
pub trait TaskNodeData {
    /// Unique id of this task.
    fn id(&self) -> &str;

    /// Ids of the tasks this task depends on.
    fn parent_ids(&self) -> &[String];

    /// Ids of the tasks that depend on this task.
    fn children(&self) -> &[String];
}
