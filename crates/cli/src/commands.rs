//! Command execution against a project snapshot.
//!
//! Every command loads the snapshot into a [`Session`], applies one
//! operation, and writes the snapshot back unless it only reads. Commands
//! that sync use the HTTP backend; the rest echo through [`LocalBackend`] so
//! the session's re-sorting and key derivation still run.

use crate::cli::{CliError, Commands, OutputFormat, SemanticCommands};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use taskweave_core::{
    Config, ExecutionEvaluator, LocalBackend, ProjectSnapshot, Session, SyncBackend, SyncOutcome,
};
use taskweave_http::HttpSyncBackend;
use taskweave_task_graph::{ValidationResult, dependency_levels, validate};
use tracing::{info, warn};

/// Everything a command needs besides its arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Project snapshot path.
    pub project: PathBuf,
    /// Effective configuration.
    pub config: Config,
}

impl CommandContext {
    fn backend(&self, command: &Commands) -> Result<Arc<dyn SyncBackend>, CliError> {
        if command.wants_sync() {
            Ok(Arc::new(HttpSyncBackend::new(&self.config)?))
        } else {
            Ok(Arc::new(LocalBackend::new()))
        }
    }

    fn load_snapshot(&self) -> Result<ProjectSnapshot, CliError> {
        let is_new = !self.project.exists();
        let mut snapshot = ProjectSnapshot::load(&self.project)?;
        if is_new {
            snapshot.select_strategy = self.config.select_strategy;
        }
        Ok(snapshot)
    }

    fn load_session(
        &self,
        command: &Commands,
        snapshot: ProjectSnapshot,
    ) -> Result<Session, CliError> {
        Ok(Session::from_snapshot(
            self.backend(command)?,
            self.config.resolve_session_id(),
            snapshot,
        )?)
    }
}

/// Run one command and return the text to print.
pub async fn execute(command: Commands, ctx: &CommandContext) -> Result<String, CliError> {
    let snapshot = ctx.load_snapshot()?;
    if matches!(command, Commands::Check) {
        return check(&snapshot);
    }

    let session = ctx.load_session(&command, snapshot)?;
    let read_only = command.is_read_only();

    let output = match command {
        Commands::Show { format } => show(&session, format)?,
        Commands::Check => check(&session.snapshot())?,
        Commands::AddTask { sync } => {
            let id = session.add_task();
            let mut output = format!("Added task {id}");
            if sync {
                append_outcome(&mut output, session.sync(None).await);
            }
            output
        }
        Commands::Delete { task, .. } => {
            let outcome = session.delete(&task).await?;
            describe(outcome, &format!("Deleted task {task}"), &task)
        }
        Commands::AddParent { task, parent, .. } => {
            let outcome = session.add_parent(&task, &parent).await?;
            describe(outcome, &format!("Added {parent} as parent of {task}"), &task)
        }
        Commands::RemoveParent { task, parent, .. } => {
            let outcome = session.remove_parent(&task, &parent).await?;
            describe(outcome, &format!("Removed {parent} from parents of {task}"), &task)
        }
        Commands::SetOutputKey { task, key, .. } => {
            let outcome = session.update_output_key(&task, &key).await;
            describe(outcome, &format!("Set output key of {task} to {key}"), &task)
        }
        Commands::SetInputKeys { task, keys, sync } => {
            let message = format!("Set input keys of {task} to [{}]", keys.join(", "));
            let outcome = session.update_doc_input_keys(&task, keys, sync).await;
            describe(outcome, &message, &task)
        }
        Commands::SetEvaluators { file } => {
            let content = std::fs::read_to_string(&file).map_err(|e| {
                CliError::config(format!("Failed to read {}: {e}", file.display()))
            })?;
            let evaluators: Vec<ExecutionEvaluator> = serde_json::from_str(&content)
                .map_err(|e| CliError::config(format!("Invalid evaluators in {}: {e}", file.display())))?;
            session.set_evaluators(evaluators);
            format!("Loaded {} evaluators", session.evaluators().len())
        }
        Commands::Sync => {
            let mut output = format!("Synced {} tasks", session.primitive_tasks().len());
            append_outcome(&mut output, session.sync(None).await);
            output
        }
        Commands::Semantic { subcommand } => semantic(&session, subcommand)?,
    };

    if !read_only {
        session.snapshot().save(&ctx.project)?;
        info!(path = %ctx.project.display(), "Saved project snapshot");
    }
    Ok(output)
}

fn semantic(session: &Session, command: SemanticCommands) -> Result<String, CliError> {
    match command {
        SemanticCommands::Add => Ok(format!("Added semantic task {}", session.add_semantic_task())),
        SemanticCommands::Delete { task } => {
            if session.delete_semantic_task(&task) {
                Ok(format!("Deleted semantic task {task}"))
            } else {
                Err(unknown_task(&task))
            }
        }
        SemanticCommands::AddParent { task, parent } => {
            if session.add_semantic_parent(&task, &parent) {
                Ok(format!("Added {parent} as parent of semantic task {task}"))
            } else {
                Ok(format!("No change: {parent} -> {task} already linked or unknown"))
            }
        }
        SemanticCommands::Strategy { strategy } => {
            session.set_select_strategy(strategy);
            Ok(format!("Select strategy set to {strategy}"))
        }
    }
}

fn unknown_task(task: &str) -> CliError {
    CliError::config(format!("Unknown task '{task}'"))
        .with_help("Run 'taskweave show' to list task ids")
}

fn describe(outcome: SyncOutcome, done: &str, task: &str) -> String {
    if outcome == SyncOutcome::Skipped {
        return format!("No change: task {task} unknown or already in that state");
    }
    let mut output = done.to_string();
    append_outcome(&mut output, outcome);
    output
}

fn append_outcome(output: &mut String, outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Failed => {
            warn!("Backend sync failed, local changes kept");
            output.push_str(" (sync failed, local changes kept)");
        }
        SyncOutcome::Stale => output.push_str(" (stale sync response dropped)"),
        SyncOutcome::Applied | SyncOutcome::NotRequested | SyncOutcome::Skipped => {}
    }
}

fn show(session: &Session, format: OutputFormat) -> Result<String, CliError> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(&session.snapshot())
            .map_err(|e| CliError::other(format!("Failed to serialize project: {e}")));
    }

    session.read(|state| {
        let tasks = state.primitive.tasks();
        let levels = dependency_levels(tasks).map_err(|e| CliError::graph(e.to_string()))?;
        let mut out = String::new();

        let _ = writeln!(out, "Primitive tasks ({}):", tasks.len());
        for (depth, level) in levels.iter().enumerate() {
            for id in level {
                let Some(task) = state.primitive.get(id) else {
                    continue;
                };
                let marker = if state.primitive.root_id() == Some(id.as_str()) {
                    " [root]"
                } else {
                    ""
                };
                let flags = match (state.status.executable(id), state.status.executed(id)) {
                    (_, true) => " executed",
                    (true, false) => " executable",
                    (false, false) => "",
                };
                let _ = writeln!(out, "  L{depth} {id}  {}{marker}{flags}", task.label);
                if !task.parent_ids.is_empty() {
                    let _ = writeln!(out, "      parents: {}", task.parent_ids.join(", "));
                }
                if let Some(execution) = &task.execution {
                    let _ = writeln!(out, "      tool: {}", execution.tool);
                }
                if !task.doc_input_keys.is_empty() {
                    let _ = writeln!(out, "      reads: {}", task.doc_input_keys.join(", "));
                }
                if let Some(key) = &task.state_output_key {
                    let _ = writeln!(out, "      writes: {key}");
                }
                if !task.existing_keys.is_empty() {
                    let _ = writeln!(out, "      available: {}", task.existing_keys.join(", "));
                }
            }
        }

        let evaluators = state.evaluators.evaluators();
        if !evaluators.is_empty() {
            let _ = writeln!(out, "Evaluators ({}):", evaluators.len());
            for evaluator in evaluators {
                let root = if evaluator.is_root { " [root]" } else { "" };
                let _ = writeln!(out, "  {} -> {}{root}", evaluator.name, evaluator.task);
            }
        }

        let semantic = state.semantic.tasks();
        let _ = writeln!(
            out,
            "Semantic tasks: {} (strategy {})",
            semantic.len(),
            state.semantic.select_strategy()
        );
        Ok(out.trim_end().to_string())
    })
}

fn report(name: &str, result: &ValidationResult, out: &mut String) -> bool {
    if result.is_valid {
        let _ = writeln!(out, "{name}: ok");
    } else {
        let _ = writeln!(out, "{name}: {} problem(s)", result.errors.len());
        for error in &result.errors {
            let _ = writeln!(out, "  - {error}");
        }
    }
    result.is_valid
}

fn check(snapshot: &ProjectSnapshot) -> Result<String, CliError> {
    let primitive = validate(&snapshot.primitive_tasks);
    let semantic = validate(&snapshot.semantic_tasks);

    let mut out = String::new();
    let primitive_ok = report("primitive graph", &primitive, &mut out);
    let semantic_ok = report("semantic graph", &semantic, &mut out);
    let out = out.trim_end().to_string();

    if primitive_ok && semantic_ok {
        Ok(out)
    } else {
        Err(CliError::graph(out))
    }
}
