//! HTTP sync backend for taskweave.
//!
//! Posts the full primitive task array to
//! `{server_address}/primitive_task/update/` and returns the backend's
//! canonical view. Timeouts come from [`Config::request_timeout`].

use async_trait::async_trait;
use reqwest::Client;
use taskweave_core::{Config, Error, Result, SyncBackend, UpdateRequest, UpdateResponse};
use tracing::debug;

/// Sync backend talking to the taskweave server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSyncBackend {
    client: Client,
    endpoint: String,
}

impl HttpSyncBackend {
    /// Create a backend for the server configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("taskweave/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.sync_endpoint(),
        })
    }

    /// URL the backend posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SyncBackend for HttpSyncBackend {
    async fn update_primitive_tasks(&self, request: UpdateRequest) -> Result<UpdateResponse> {
        debug!(
            url = %self.endpoint,
            tasks = request.primitive_tasks.len(),
            "Posting primitive tasks"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::sync(format!("Failed to reach {}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::sync(format!(
                "Backend rejected update (HTTP {status}): {}",
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::sync(format!("Failed to parse backend response: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
