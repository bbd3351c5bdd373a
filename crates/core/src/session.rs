//! The editing session.
//!
//! A [`Session`] owns every store behind one lock and is the only place
//! where mutations meet the [`SyncBackend`]. Mutations run synchronously
//! under the lock; the backend round-trip happens with the lock released,
//! and its response is merged only if no newer request was issued in the
//! meantime.
//!
//! A continuation whose response turns out stale is not lost: it runs
//! against the newest merged state, right away if that response has already
//! been applied, otherwise together with it.
//!
//! Renderers read cloned snapshots and call [`Session::subscribe`] to learn
//! when to re-read. Two surfaces editing the same session race as
//! last-writer-wins.

use crate::evaluators::EvaluatorStore;
use crate::graph::PrimitiveTaskStore;
use crate::model::{
    ExecutionEvaluator, ExecutionState, PrimitiveTask, SelectStrategy, SemanticTask,
};
use crate::semantic::SemanticPlanStore;
use crate::snapshot::ProjectSnapshot;
use crate::status::ExecutionStatusStore;
use crate::sync::{SyncBackend, SyncOutcome, UpdateRequest};
use crate::Result;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counter bumped after every observable change.
pub type Revision = u64;

/// Work to run against the merged state once a sync has been applied.
pub type Continuation = Box<dyn FnOnce(&mut SessionState) + Send>;

/// All stores of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Executable task DAG.
    pub primitive: PrimitiveTaskStore,
    /// Evaluators of primitive task outputs.
    pub evaluators: EvaluatorStore,
    /// Server-reported execution flags.
    pub status: ExecutionStatusStore,
    /// Semantic decomposition tree.
    pub semantic: SemanticPlanStore,
}

/// Shared handle to the session state and its sync backend.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    backend: Arc<dyn SyncBackend>,
    session_id: Arc<str>,
    sequence: Arc<AtomicU64>,
    applied: Arc<AtomicU64>,
    pending: Arc<Mutex<Vec<Continuation>>>,
    revision: Arc<watch::Sender<Revision>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("backend", &self.backend.name())
            .field("revision", &*self.revision.borrow())
            .finish_non_exhaustive()
    }
}

fn derive_evaluator_keys() -> Continuation {
    Box::new(|state: &mut SessionState| {
        state
            .evaluators
            .collect_target_task_keys(state.primitive.tasks());
    })
}

impl Session {
    /// Create an empty session.
    pub fn new(backend: Arc<dyn SyncBackend>, session_id: impl Into<String>) -> Self {
        Self::with_state(backend, session_id, SessionState::default())
    }

    /// Create a session around existing stores.
    pub fn with_state(
        backend: Arc<dyn SyncBackend>,
        session_id: impl Into<String>,
        state: SessionState,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(state)),
            backend,
            session_id: Arc::from(session_id.into()),
            sequence: Arc::new(AtomicU64::new(0)),
            applied: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(Vec::new())),
            revision: Arc::new(revision),
        }
    }

    /// Restore a session from a project snapshot.
    ///
    /// Primitive tasks are re-sorted and their keys re-derived, so a
    /// hand-edited file loads in hierarchy order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Graph`] if the primitive tasks cannot be
    /// ordered (cycle, unknown parent, one-sided link).
    pub fn from_snapshot(
        backend: Arc<dyn SyncBackend>,
        session_id: impl Into<String>,
        snapshot: ProjectSnapshot,
    ) -> Result<Self> {
        let mut primitive = PrimitiveTaskStore::from_tasks(snapshot.primitive_tasks);
        primitive.sort_nodes_by_hierarchy()?;
        primitive.collect_input_keys();
        let mut evaluators = EvaluatorStore::new();
        evaluators.set_evaluators(snapshot.evaluators, primitive.tasks());
        let mut status = ExecutionStatusStore::new();
        status.replace(snapshot.execution_state);
        let semantic =
            SemanticPlanStore::from_tasks(snapshot.semantic_tasks, snapshot.select_strategy);

        Ok(Self::with_state(
            backend,
            session_id,
            SessionState {
                primitive,
                evaluators,
                status,
                semantic,
            },
        ))
    }

    /// Export everything the session holds.
    #[must_use]
    pub fn snapshot(&self) -> ProjectSnapshot {
        let state = self.lock();
        ProjectSnapshot {
            primitive_tasks: state.primitive.tasks().to_vec(),
            semantic_tasks: state.semantic.tasks().to_vec(),
            evaluators: state.evaluators.evaluators().to_vec(),
            execution_state: state.status.states().cloned(),
            select_strategy: state.semantic.select_strategy(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Continuation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Run `f` with the state locked and notify subscribers afterwards.
    fn mutate<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let result = f(&mut *self.lock());
        self.notify();
        result
    }

    /// Id sent with every sync request.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Name of the configured sync backend.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Receive a new revision after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.revision.subscribe()
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> Revision {
        *self.revision.borrow()
    }

    /// Read the state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&*self.lock())
    }

    /// Primitive tasks in hierarchy order.
    #[must_use]
    pub fn primitive_tasks(&self) -> Vec<PrimitiveTask> {
        self.read(|s| s.primitive.tasks().to_vec())
    }

    /// Semantic tasks.
    #[must_use]
    pub fn semantic_tasks(&self) -> Vec<SemanticTask> {
        self.read(|s| s.semantic.tasks().to_vec())
    }

    /// Evaluators in store order.
    #[must_use]
    pub fn evaluators(&self) -> Vec<ExecutionEvaluator> {
        self.read(|s| s.evaluators.evaluators().to_vec())
    }

    /// Execution flags, if the backend has reported any.
    #[must_use]
    pub fn execution_states(&self) -> Option<BTreeMap<String, ExecutionState>> {
        self.read(|s| s.status.states().cloned())
    }

    /// Id of the primitive root task.
    #[must_use]
    pub fn root_id(&self) -> Option<String> {
        self.read(|s| s.primitive.root_id().map(str::to_string))
    }

    /// Select a primitive task for inspection.
    pub fn inspect(&self, id: Option<&str>) {
        self.mutate(|s| s.primitive.inspect(id));
    }

    /// Append a primitive task; see [`PrimitiveTaskStore::add_task`].
    pub fn add_task(&self) -> String {
        self.mutate(|s| s.primitive.add_task())
    }

    /// Delete a primitive task and sync.
    pub async fn delete(&self, task_id: &str) -> Result<SyncOutcome> {
        if !self.mutate(|s| s.primitive.delete(task_id))? {
            return Ok(SyncOutcome::Skipped);
        }
        Ok(self.sync(None).await)
    }

    /// Add a parent edge and sync.
    pub async fn add_parent(&self, task_id: &str, parent_id: &str) -> Result<SyncOutcome> {
        if !self.mutate(|s| s.primitive.add_parent(task_id, parent_id))? {
            return Ok(SyncOutcome::Skipped);
        }
        Ok(self.sync(None).await)
    }

    /// Remove a parent edge and sync.
    pub async fn remove_parent(&self, task_id: &str, parent_id: &str) -> Result<SyncOutcome> {
        if !self.mutate(|s| s.primitive.remove_parent(task_id, parent_id))? {
            return Ok(SyncOutcome::Skipped);
        }
        Ok(self.sync(None).await)
    }

    /// Swap in a new version of a primitive task.
    ///
    /// With `needs_update` the continuation runs after a sync response is
    /// merged, even if its own response goes stale, and is dropped if the
    /// sync fails. Without it the continuation runs right away.
    pub async fn update_primitive_task(
        &self,
        task_id: &str,
        task: PrimitiveTask,
        needs_update: bool,
        continuation: Option<Continuation>,
    ) -> SyncOutcome {
        let (replaced, continuation) = self.mutate(|s| {
            if !s.primitive.replace_task(task_id, task) {
                return (false, continuation);
            }
            s.primitive.collect_input_keys();
            if needs_update {
                return (true, continuation);
            }
            if let Some(continuation) = continuation {
                continuation(s);
            }
            (true, None)
        });

        if !replaced {
            return SyncOutcome::Skipped;
        }
        if !needs_update {
            return SyncOutcome::NotRequested;
        }
        self.sync(continuation).await
    }

    /// Rename a task's output key, sync, then re-derive evaluator keys.
    pub async fn update_output_key(&self, task_id: &str, key: &str) -> SyncOutcome {
        let Some(task) = self.read(|s| s.primitive.with_output_key(task_id, key)) else {
            debug!(task = %task_id, "Output key update on unknown task ignored");
            return SyncOutcome::Skipped;
        };
        self.update_primitive_task(task_id, task, true, Some(derive_evaluator_keys()))
            .await
    }

    /// Change a task's input keys, optionally sync, then re-derive evaluator
    /// keys.
    pub async fn update_doc_input_keys(
        &self,
        task_id: &str,
        keys: Vec<String>,
        needs_update: bool,
    ) -> SyncOutcome {
        let Some(task) = self.read(|s| s.primitive.with_doc_input_keys(task_id, keys)) else {
            debug!(task = %task_id, "Input key update on unknown task ignored");
            return SyncOutcome::Skipped;
        };
        self.update_primitive_task(task_id, task, needs_update, Some(derive_evaluator_keys()))
            .await
    }

    /// Replace all evaluators; see [`EvaluatorStore::set_evaluators`].
    pub fn set_evaluators(&self, raw: Vec<ExecutionEvaluator>) {
        self.mutate(|s| s.evaluators.set_evaluators(raw, s.primitive.tasks()));
    }

    /// Replace one evaluator by name.
    pub fn update_evaluator(&self, name: &str, evaluator: ExecutionEvaluator) -> bool {
        self.mutate(|s| s.evaluators.update_evaluator(name, evaluator))
    }

    /// Append a semantic task.
    pub fn add_semantic_task(&self) -> String {
        self.mutate(|s| s.semantic.add_task())
    }

    /// Delete a semantic task.
    pub fn delete_semantic_task(&self, task_id: &str) -> bool {
        self.mutate(|s| s.semantic.delete_task(task_id))
    }

    /// Link two semantic tasks.
    pub fn add_semantic_parent(&self, task_id: &str, parent_id: &str) -> bool {
        self.mutate(|s| s.semantic.add_parent(task_id, parent_id))
    }

    /// Change the tree-search selection strategy.
    pub fn set_select_strategy(&self, strategy: SelectStrategy) {
        self.mutate(|s| s.semantic.set_select_strategy(strategy));
    }

    /// Push all primitive tasks to the backend and merge the response.
    ///
    /// Failures are logged and leave local state as it was. A response that
    /// arrives after a newer request was issued is dropped, but its
    /// continuation is kept for the newest response.
    pub async fn sync(&self, continuation: Option<Continuation>) -> SyncOutcome {
        let (sequence, request) = {
            let state = self.lock();
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            let request = UpdateRequest {
                primitive_tasks: state.primitive.tasks().to_vec(),
                session_id: self.session_id.to_string(),
            };
            (sequence, request)
        };

        let response = match self.backend.update_primitive_tasks(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    backend = self.backend.name(),
                    sequence,
                    error = %e,
                    "Sync failed, keeping local state"
                );
                return SyncOutcome::Failed;
            }
        };

        let outcome = {
            let mut state = self.lock();
            let latest = self.sequence.load(Ordering::SeqCst);
            if sequence == latest {
                let tasks = response.primitive_tasks.len();
                state.primitive.replace(response.primitive_tasks);
                if response.execution_state.is_some() {
                    state.status.replace(response.execution_state);
                }
                self.applied.store(sequence, Ordering::SeqCst);
                let deferred = std::mem::take(&mut *self.pending());
                for run in deferred.into_iter().chain(continuation) {
                    run(&mut *state);
                }
                info!(backend = self.backend.name(), sequence, tasks, "Applied sync response");
                SyncOutcome::Applied
            } else {
                warn!(sequence, latest, "Dropping stale sync response");
                let Some(continuation) = continuation else {
                    return SyncOutcome::Stale;
                };
                if self.applied.load(Ordering::SeqCst) == latest {
                    debug!(sequence, "Running stale continuation on merged state");
                    continuation(&mut *state);
                } else {
                    debug!(sequence, latest, "Deferring stale continuation");
                    self.pending().push(continuation);
                }
                SyncOutcome::Stale
            }
        };
        self.notify();
        outcome
    }

    /// Run [`Session::sync`] in the background.
    pub fn spawn_sync(&self, continuation: Option<Continuation>) -> JoinHandle<SyncOutcome> {
        let session = self.clone();
        tokio::spawn(async move { session.sync(continuation).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::sync::{LocalBackend, UpdateResponse};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Answers the n-th call after `delays[n]`, tagging task labels with n.
    struct DelayedBackend {
        delays: Vec<u64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SyncBackend for DelayedBackend {
        async fn update_primitive_tasks(&self, request: UpdateRequest) -> Result<UpdateResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delays.get(call).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let primitive_tasks = request
                .primitive_tasks
                .into_iter()
                .map(|mut t| {
                    t.label = format!("response-{call}");
                    t
                })
                .collect();
            Ok(UpdateResponse {
                primitive_tasks,
                execution_state: None,
            })
        }

        fn name(&self) -> &'static str {
            "delayed"
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl SyncBackend for FailingBackend {
        async fn update_primitive_tasks(&self, _request: UpdateRequest) -> Result<UpdateResponse> {
            Err(Error::sync("connection refused"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn local_session() -> Session {
        Session::new(Arc::new(LocalBackend::new()), "test-session")
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_dropped() {
        let backend = DelayedBackend {
            delays: vec![100, 10],
            calls: AtomicUsize::new(0),
        };
        let session = Session::new(Arc::new(backend), "s");
        session.add_task();

        let (first, second) = tokio::join!(session.sync(None), session.sync(None));
        assert_eq!(first, SyncOutcome::Stale);
        assert_eq!(second, SyncOutcome::Applied);
        for task in session.primitive_tasks() {
            assert_eq!(task.label, "response-1");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_output_key_update_still_prunes_evaluators() {
        let backend = DelayedBackend {
            delays: vec![0, 100, 10],
            calls: AtomicUsize::new(0),
        };
        let session = Session::new(Arc::new(backend), "s");
        let a = session.add_task();
        assert_eq!(session.update_output_key(&a, "old").await, SyncOutcome::Applied);

        let mut evaluator = ExecutionEvaluator::new("Check", a.clone());
        evaluator.doc_input_keys = vec!["old".to_string()];
        session.set_evaluators(vec![evaluator]);

        let (renamed, synced) =
            tokio::join!(session.update_output_key(&a, "new"), session.sync(None));
        assert_eq!(renamed, SyncOutcome::Stale);
        assert_eq!(synced, SyncOutcome::Applied);

        let evaluators = session.evaluators();
        assert!(evaluators[0].doc_input_keys.is_empty());
        assert_eq!(evaluators[0].existing_keys, vec!["new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_continuation_runs_with_newest_response() {
        let backend = DelayedBackend {
            delays: vec![10, 100],
            calls: AtomicUsize::new(0),
        };
        let session = Session::new(Arc::new(backend), "s");
        session.add_task();

        let (tx, rx) = std::sync::mpsc::channel();
        let continuation: Continuation = Box::new(move |state: &mut SessionState| {
            tx.send(state.primitive.tasks()[0].label.clone()).unwrap();
        });

        let (first, second) =
            tokio::join!(session.sync(Some(continuation)), session.sync(None));
        assert_eq!(first, SyncOutcome::Stale);
        assert_eq!(second, SyncOutcome::Applied);
        assert_eq!(rx.try_recv().unwrap(), "response-1");
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_optimistic_state() {
        let session = Session::new(Arc::new(FailingBackend), "s");
        let a = session.add_task();
        let b = session.add_task();

        let outcome = session.add_parent(&a, &b).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Failed);
        let tasks = session.primitive_tasks();
        let task = tasks.iter().find(|t| t.id == a).unwrap();
        assert_eq!(task.parent_ids, vec![b]);
    }

    #[tokio::test]
    async fn test_noop_mutations_skip_sync() {
        let session = Session::new(Arc::new(FailingBackend), "s");
        assert_eq!(session.delete("missing").await.unwrap(), SyncOutcome::Skipped);
        assert_eq!(
            session.update_output_key("missing", "x").await,
            SyncOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_revisions() {
        let session = local_session();
        let mut rx = session.subscribe();
        let id = session.add_task();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        session.delete(&id).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(session.revision() >= 3);
    }

    #[tokio::test]
    async fn test_continuation_without_sync_runs_immediately() {
        let session = Session::new(Arc::new(FailingBackend), "s");
        let id = session.add_task();
        let task = session.primitive_tasks().into_iter().find(|t| t.id == id).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let outcome = session
            .update_primitive_task(&id, task, false, Some(Box::new(move |_: &mut SessionState| tx.send(()).unwrap())))
            .await;
        assert_eq!(outcome, SyncOutcome::NotRequested);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_spawn_sync_applies() {
        let session = local_session();
        session.add_task();
        let outcome = session.spawn_sync(None).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Applied);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let session = local_session();
        let a = session.add_task();
        session.set_evaluators(vec![
            ExecutionEvaluator::new("Check", a.clone()),
            ExecutionEvaluator::new("Check", a),
        ]);
        session.add_semantic_task();
        session.set_select_strategy(SelectStrategy::Greedy);

        let snapshot = session.snapshot();
        let restored =
            Session::from_snapshot(Arc::new(LocalBackend::new()), "s2", snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.root_id(), session.root_id());
    }

    #[test]
    fn test_snapshot_is_sorted_on_load() {
        let mut parent = PrimitiveTask::placeholder("a");
        parent.children = vec!["b".to_string()];
        let mut child = PrimitiveTask::placeholder("b");
        child.parent_ids = vec!["a".to_string()];
        let snapshot = ProjectSnapshot {
            primitive_tasks: vec![child, parent],
            ..ProjectSnapshot::default()
        };

        let session = Session::from_snapshot(Arc::new(LocalBackend::new()), "s", snapshot).unwrap();
        let ids: Vec<_> = session.primitive_tasks().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_cyclic_snapshot_is_rejected() {
        let mut a = PrimitiveTask::placeholder("a");
        a.parent_ids = vec!["b".to_string()];
        a.children = vec!["b".to_string()];
        let mut b = PrimitiveTask::placeholder("b");
        b.parent_ids = vec!["a".to_string()];
        b.children = vec!["a".to_string()];
        let snapshot = ProjectSnapshot {
            primitive_tasks: vec![a, b],
            ..ProjectSnapshot::default()
        };

        let err = Session::from_snapshot(Arc::new(LocalBackend::new()), "s", snapshot).unwrap_err();
        assert!(matches!(err, Error::Graph(_)));
    }
}
