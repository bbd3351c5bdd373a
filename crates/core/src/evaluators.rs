//! Evaluator store.

use crate::model::{ExecutionEvaluator, PrimitiveTask, push_unique};
use crate::prompt;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Evaluators in primitive-task order, with unique names.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorStore {
    evaluators: Vec<ExecutionEvaluator>,
}

impl EvaluatorStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluators in store order.
    #[must_use]
    pub fn evaluators(&self) -> &[ExecutionEvaluator] {
        &self.evaluators
    }

    /// Look up an evaluator by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExecutionEvaluator> {
        self.evaluators.iter().find(|e| e.name == name)
    }

    /// Replace all evaluators.
    ///
    /// Repeated names get a `-k` suffix, evaluators are stably ordered by the
    /// position of their target in `tasks` (unknown targets last), and the
    /// first evaluator of each target becomes its root evaluator.
    pub fn set_evaluators(&mut self, raw: Vec<ExecutionEvaluator>, tasks: &[PrimitiveTask]) {
        let mut evaluators = dedup_names(raw);

        let positions: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        evaluators.sort_by_key(|e| positions.get(e.task.as_str()).copied().unwrap_or(usize::MAX));

        let mut seen_targets = HashSet::new();
        for evaluator in &mut evaluators {
            evaluator.is_root = seen_targets.insert(evaluator.task.clone());
        }
        self.evaluators = evaluators;
    }

    /// Replace the evaluator called `name`. Returns `false` if there is none.
    pub fn update_evaluator(&mut self, name: &str, evaluator: ExecutionEvaluator) -> bool {
        match self.evaluators.iter_mut().find(|e| e.name == name) {
            Some(slot) => {
                *slot = evaluator;
                true
            }
            None => {
                debug!(evaluator = %name, "Update of unknown evaluator ignored");
                false
            }
        }
    }

    /// Re-derive every evaluator's keys from its target task.
    ///
    /// `existing_keys` becomes the target's input keys plus its output key,
    /// `doc_input_keys` is narrowed to that set, and the prompt body is
    /// re-rendered. Evaluators whose target is gone are left alone.
    pub fn collect_target_task_keys(&mut self, tasks: &[PrimitiveTask]) {
        for evaluator in &mut self.evaluators {
            let Some(target) = tasks.iter().find(|t| t.id == evaluator.task) else {
                debug!(evaluator = %evaluator.name, task = %evaluator.task, "Evaluator target missing");
                continue;
            };

            let mut existing = Vec::new();
            for key in &target.doc_input_keys {
                push_unique(&mut existing, key);
            }
            if let Some(key) = &target.state_output_key {
                push_unique(&mut existing, key);
            }

            evaluator.doc_input_keys.retain(|k| existing.contains(k));
            evaluator.existing_keys = existing;
            if let Some(parameters) = evaluator.parameters.as_mut() {
                prompt::apply_to_messages(&mut parameters.prompt_template, &evaluator.doc_input_keys);
            }
        }
    }
}

fn dedup_names(raw: Vec<ExecutionEvaluator>) -> Vec<ExecutionEvaluator> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();

    raw.into_iter()
        .map(|mut evaluator| {
            if taken.contains(&evaluator.name) {
                let count = repeats.entry(evaluator.name.clone()).or_insert(0);
                let renamed = loop {
                    *count += 1;
                    let candidate = format!("{}-{}", evaluator.name, count);
                    if !taken.contains(&candidate) {
                        break candidate;
                    }
                };
                debug!(from = %evaluator.name, to = %renamed, "Renamed duplicate evaluator");
                evaluator.name = renamed;
            }
            taken.insert(evaluator.name.clone());
            evaluator
        })
        .collect()
}
