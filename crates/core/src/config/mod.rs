//! Configuration types for taskweave
//!
//! Read from `config.toml` in the user config directory unless a path is
//! given explicitly. Command-line flags and environment variables override
//! individual fields afterwards.

use crate::model::SelectStrategy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path appended to the server address for primitive task sync.
pub const SYNC_PATH: &str = "/primitive_task/update/";

/// Default backend address.
pub const DEFAULT_SERVER_ADDRESS: &str = "http://localhost:8000";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for taskweave
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Base URL of the backend
    pub server_address: String,

    /// Session id sent with every sync; generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Default tree-search selection strategy for new projects
    pub select_strategy: SelectStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            session_id: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            select_strategy: SelectStrategy::default(),
        }
    }
}

impl Config {
    /// `<config dir>/taskweave/config.toml`, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskweave").join("config.toml"))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Load from `path`, or from [`Config::default_path`] when it exists,
    /// falling back to defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path().filter(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Full URL of the sync endpoint.
    #[must_use]
    pub fn sync_endpoint(&self) -> String {
        format!("{}{SYNC_PATH}", self.server_address.trim_end_matches('/'))
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured session id, or a fresh UUID v4.
    #[must_use]
    pub fn resolve_session_id(&self) -> String {
        self.session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}
