//! taskweave command-line front-end.
//!
//! Each invocation edits one project snapshot file: it loads the file into a
//! [`taskweave_core::Session`], runs a single command, optionally syncs with
//! the backend, and writes the file back.

pub mod cli;
pub mod commands;
pub mod tracing;

use crate::cli::{Cli, CliError};
use crate::commands::CommandContext;
use ::tracing::Instrument;
use taskweave_core::Config;

/// Resolve the effective configuration from the config file and CLI flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(server) = &cli.server {
        config.server_address.clone_from(server);
    }
    if let Some(session) = &cli.session {
        config.session_id = Some(session.clone());
    }
    Ok(config)
}

/// Run the parsed command line and return the text to print.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let config = resolve_config(&cli)?;
    let ctx = CommandContext {
        project: cli.project,
        config,
    };
    let span = crate::command_span!(cli.command.name());
    commands::execute(cli.command, &ctx).instrument(span).await
}
