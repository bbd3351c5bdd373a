//! Structured logging for the taskweave CLI.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! Every event of one invocation carries the same correlation id through
//! [`command_span!`](crate::command_span).

use std::sync::OnceLock;
pub use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, fmt};
use uuid::Uuid;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Multi-line, human-oriented output
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON with span context
    Json,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown log format: {s}")),
        }
    }
}

/// Verbosity selected with `--level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Everything, including per-task traces
    Trace,
    /// Store internals such as re-sorts and lookup misses
    Debug,
    /// Applied syncs and saved snapshots
    Info,
    /// Failed or stale syncs (default)
    Warn,
    /// Errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Logging setup for one process.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Line format
    pub format: TracingFormat,
    /// Level applied to the taskweave crates when `RUST_LOG` is unset
    pub level: Level,
    /// `EnvFilter` directive that overrides both `RUST_LOG` and `level`
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: Level::WARN,
            filter: None,
        }
    }
}

static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Id shared by every span of this process.
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

const TARGETS: [&str; 4] = [
    "taskweave",
    "taskweave_core",
    "taskweave_http",
    "taskweave_task_graph",
];

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_filter(config: &TracingConfig) -> miette::Result<EnvFilter> {
    let filter = match &config.filter {
        Some(directive) => EnvFilter::try_new(directive),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directives(config.level))),
    };
    filter.map_err(|e| miette::miette!("Invalid log filter: {e}"))
}

fn output_layer(format: TracingFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_writer(std::io::stderr);
    match format {
        TracingFormat::Pretty => layer.pretty().with_target(true).boxed(),
        TracingFormat::Compact => layer.compact().with_target(false).boxed(),
        TracingFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an invalid filter directive or when a subscriber is already set.
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let filter = build_filter(&config)?;

    tracing_subscriber::registry()
        .with(output_layer(config.format))
        .with(filter)
        .try_init()
        .map_err(|e| miette::miette!("Failed to install log subscriber: {e}"))?;

    tracing::debug!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Logging initialized"
    );
    Ok(())
}

/// Span wrapping one CLI command, tagged with the process correlation id.
#[macro_export]
macro_rules! command_span {
    ($command:expr) => {
        ::tracing::info_span!(
            "command",
            command = %$command,
            correlation_id = %$crate::tracing::correlation_id(),
            start_time = %::chrono::Utc::now().to_rfc3339(),
        )
    };
}
