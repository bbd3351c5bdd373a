use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use taskweave_core::SelectStrategy;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Graph, sync or I/O error exit code
pub const EXIT_RUNTIME: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(taskweave::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Task graph rejected the operation (exit code 3)
    #[error("Task graph error: {message}")]
    #[diagnostic(code(taskweave::cli::graph))]
    Graph {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(taskweave::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new graph error
    #[must_use]
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Add help text to an existing error, returning a new error with the help text set.
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Graph { message, .. } => Self::Graph { message, help },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }
}

/// Convert `taskweave_core::Error` to appropriate `CliError` variant.
impl From<taskweave_core::Error> for CliError {
    fn from(err: taskweave_core::Error) -> Self {
        match err {
            taskweave_core::Error::Configuration { message } => Self::config(message),
            taskweave_core::Error::WouldCreateCycle { .. } => Self::graph(err.to_string())
                .with_help("Remove the path leading from the task back to the parent first"),
            taskweave_core::Error::Graph(inner) => Self::graph(inner.to_string())
                .with_help("Run 'taskweave check' to list every structural problem"),
            taskweave_core::Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::other(format!("I/O error during {operation}{path_str}: {source}"))
                    .with_help("Check file permissions and ensure the path exists")
            }
            taskweave_core::Error::Sync { .. } | taskweave_core::Error::Serialization { .. } => {
                Self::other(err.to_string())
            }
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Graph { .. } | CliError::Other { .. } => EXIT_RUNTIME,
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Graph { .. } => "graph",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Output format for command results
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Command-line editor for taskweave task graphs.
#[derive(Parser, Debug)]
#[command(name = "taskweave")]
#[command(about = "Edit task decomposition graphs and sync them with a taskweave server")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(short = 'L', long, global = true, default_value = "warn", value_enum)]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    /// Report errors as JSON on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true, env = "TASKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend address, overriding the configuration file.
    #[arg(long, global = true, env = "TASKWEAVE_SERVER")]
    pub server: Option<String>,

    /// Session id, overriding the configuration file.
    #[arg(long, global = true, env = "TASKWEAVE_SESSION")]
    pub session: Option<String>,

    /// Project snapshot file.
    #[arg(short = 'p', long, global = true, default_value = "taskweave.json")]
    pub project: PathBuf,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show primitive tasks by dependency level, with evaluators.
    Show {
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate adjacency and acyclicity of both task graphs.
    Check,
    /// Append a placeholder primitive task (creates the root first).
    AddTask {
        /// Sync with the backend afterwards.
        #[arg(long)]
        sync: bool,
    },
    /// Delete a primitive task and every reference to it.
    Delete {
        /// Task id.
        task: String,
        /// Sync with the backend afterwards.
        #[arg(long)]
        sync: bool,
    },
    /// Make one primitive task a parent of another.
    AddParent {
        /// Child task id.
        task: String,
        /// Parent task id.
        parent: String,
        /// Sync with the backend afterwards.
        #[arg(long)]
        sync: bool,
    },
    /// Remove a parent edge.
    RemoveParent {
        /// Child task id.
        task: String,
        /// Parent task id.
        parent: String,
        /// Sync with the backend afterwards.
        #[arg(long)]
        sync: bool,
    },
    /// Set the state key a task publishes its result under.
    SetOutputKey {
        /// Task id.
        task: String,
        /// New output key.
        key: String,
        /// Sync with the backend afterwards.
        #[arg(long)]
        sync: bool,
    },
    /// Set the state keys a task reads.
    SetInputKeys {
        /// Task id.
        task: String,
        /// Comma-separated keys, in prompt order.
        #[arg(value_delimiter = ',')]
        keys: Vec<String>,
        /// Sync with the backend afterwards.
        #[arg(long)]
        sync: bool,
    },
    /// Replace all evaluators with the JSON array in a file.
    SetEvaluators {
        /// JSON file holding an array of evaluators.
        file: PathBuf,
    },
    /// Push all primitive tasks to the backend and store its answer.
    Sync,
    /// Semantic decomposition tree operations.
    Semantic {
        /// The semantic operation to run.
        #[command(subcommand)]
        subcommand: SemanticCommands,
    },
}

/// Semantic tree subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SemanticCommands {
    /// Append a placeholder semantic task (creates the root first).
    Add,
    /// Delete a semantic task.
    Delete {
        /// Task id.
        task: String,
    },
    /// Make one semantic task a parent of another.
    AddParent {
        /// Child task id.
        task: String,
        /// Parent task id.
        parent: String,
    },
    /// Set the tree-search selection strategy (UCT or greedy).
    Strategy {
        /// New strategy.
        strategy: SelectStrategy,
    },
}

impl Commands {
    /// Whether the command talks to the backend.
    #[must_use]
    pub const fn wants_sync(&self) -> bool {
        match self {
            Self::AddTask { sync }
            | Self::Delete { sync, .. }
            | Self::AddParent { sync, .. }
            | Self::RemoveParent { sync, .. }
            | Self::SetOutputKey { sync, .. }
            | Self::SetInputKeys { sync, .. } => *sync,
            Self::Sync => true,
            Self::Show { .. } | Self::Check | Self::SetEvaluators { .. } | Self::Semantic { .. } => {
                false
            }
        }
    }

    /// Whether the command changes the project file.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::Show { .. } | Self::Check)
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Show { .. } => "show",
            Self::Check => "check",
            Self::AddTask { .. } => "add-task",
            Self::Delete { .. } => "delete",
            Self::AddParent { .. } => "add-parent",
            Self::RemoveParent { .. } => "remove-parent",
            Self::SetOutputKey { .. } => "set-output-key",
            Self::SetInputKeys { .. } => "set-input-keys",
            Self::SetEvaluators { .. } => "set-evaluators",
            Self::Sync => "sync",
            Self::Semantic { .. } => "semantic",
        }
    }
}

/// Parse the process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["taskweave", "show"]).unwrap();
        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert_eq!(cli.project, PathBuf::from("taskweave.json"));
        assert!(!cli.json);
        assert_eq!(
            cli.command,
            Commands::Show {
                format: OutputFormat::Text
            }
        );
    }

    #[test]
    fn test_set_input_keys_splits_commas() {
        let cli =
            Cli::try_parse_from(["taskweave", "set-input-keys", "t1", "documents,summary", "--sync"])
                .unwrap();
        assert_eq!(
            cli.command,
            Commands::SetInputKeys {
                task: "t1".to_string(),
                keys: vec!["documents".to_string(), "summary".to_string()],
                sync: true,
            }
        );
        assert!(cli.command.wants_sync());
    }

    #[test]
    fn test_semantic_strategy_parses() {
        let cli = Cli::try_parse_from(["taskweave", "semantic", "strategy", "greedy"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Semantic {
                subcommand: SemanticCommands::Strategy {
                    strategy: SelectStrategy::Greedy
                }
            }
        );
        assert!(!cli.command.wants_sync());
        assert!(Cli::try_parse_from(["taskweave", "semantic", "strategy", "random"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "taskweave",
            "delete",
            "t1",
            "--project",
            "plan.json",
            "--server",
            "http://10.0.0.2:8000",
            "-L",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.project, PathBuf::from("plan.json"));
        assert_eq!(cli.server.as_deref(), Some("http://10.0.0.2:8000"));
        assert_eq!(cli.level, LogLevel::Debug);
        assert!(!cli.command.wants_sync());
    }

    #[test]
    fn test_core_errors_map_to_exit_codes() {
        let config: CliError = taskweave_core::Error::configuration("bad").into();
        assert_eq!(exit_code_for(&config), EXIT_CLI);

        let cycle: CliError = taskweave_core::Error::WouldCreateCycle {
            task: "a".to_string(),
            parent: "b".to_string(),
        }
        .into();
        assert!(matches!(cycle, CliError::Graph { help: Some(_), .. }));
        assert_eq!(exit_code_for(&cycle), EXIT_RUNTIME);

        let sync: CliError = taskweave_core::Error::sync("down").into();
        assert_eq!(exit_code_for(&sync), EXIT_RUNTIME);
        assert_eq!(EXIT_OK, 0);
    }
}
