//! Server-reported execution flags.

use crate::model::ExecutionState;
use std::collections::BTreeMap;

/// Per-task execution flags, replaced wholesale after each sync.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStatusStore {
    states: Option<BTreeMap<String, ExecutionState>>,
}

impl ExecutionStatusStore {
    /// Create a store with no table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new table, or drop it with `None`.
    pub fn replace(&mut self, states: Option<BTreeMap<String, ExecutionState>>) {
        self.states = states;
    }

    /// Drop the table.
    pub fn clear(&mut self) {
        self.states = None;
    }

    /// Flags for one task.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ExecutionState> {
        self.states.as_ref()?.get(id).copied()
    }

    /// Whether the task can run. `false` when unknown.
    #[must_use]
    pub fn executable(&self, id: &str) -> bool {
        self.get(id).is_some_and(|s| s.executable)
    }

    /// Whether the task has run. `false` when unknown.
    #[must_use]
    pub fn executed(&self, id: &str) -> bool {
        self.get(id).is_some_and(|s| s.executed)
    }

    /// The whole table.
    #[must_use]
    pub fn states(&self) -> Option<&BTreeMap<String, ExecutionState>> {
        self.states.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_table_reports_false() {
        let store = ExecutionStatusStore::new();
        assert!(!store.executable("a"));
        assert!(!store.executed("a"));
        assert_eq!(store.states(), None);
    }

    #[test]
    fn test_replace_and_clear() {
        let mut store = ExecutionStatusStore::new();
        let mut states = BTreeMap::new();
        states.insert(
            "a".to_string(),
            ExecutionState {
                executable: true,
                executed: false,
            },
        );
        store.replace(Some(states));

        assert!(store.executable("a"));
        assert!(!store.executed("a"));
        assert!(!store.executable("b"));

        store.clear();
        assert!(!store.executable("a"));
    }
}
