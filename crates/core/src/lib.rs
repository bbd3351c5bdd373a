//! Core state management for taskweave.
//!
//! taskweave edits hierarchical task-decomposition graphs: a tree of
//! *semantic* tasks refined into a DAG of *primitive* executable tasks, plus
//! *evaluators* that score primitive task outputs. This crate owns the
//! client-side state of those graphs:
//!
//! - [`graph::PrimitiveTaskStore`]: primitive tasks, adjacency, hierarchy
//!   order and derived key sets
//! - [`evaluators::EvaluatorStore`]: evaluator naming, ordering and key sync
//! - [`status::ExecutionStatusStore`]: server-reported execution flags
//! - [`semantic::SemanticPlanStore`]: the semantic decomposition tree
//! - [`session::Session`]: the process-wide owner of all stores, which
//!   pushes mutations to a [`sync::SyncBackend`] and merges its responses

pub mod config;
pub mod error;
pub mod evaluators;
pub mod graph;
pub mod model;
pub mod prompt;
pub mod semantic;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{
    Evaluation, Execution, ExecutionEvaluator, ExecutionState, PrimitiveTask, PromptMessage,
    ROOT_ID, SelectStrategy, SemanticTask,
};
pub use session::{Continuation, Revision, Session, SessionState};
pub use snapshot::ProjectSnapshot;
pub use sync::{LocalBackend, SyncBackend, SyncOutcome, UpdateRequest, UpdateResponse};
