//! Deploy command implementation.

use crate::config::DeployConfig;
use crate::error::ConfigError;
use crate::pipeline::{DeployReport, Orchestrator, PipelineFailure};
use crate::platform::{ObjectStoreClient, PlatformClient};

/// Runs the full pipeline against the real management service
#[derive(Debug)]
pub struct DeployCommand {
    config: DeployConfig,
    platform: PlatformClient,
    store: ObjectStoreClient,
}

impl DeployCommand {
    /// Build HTTP clients for the given config. No network activity happens here.
    pub fn new(config: DeployConfig) -> Result<Self, ConfigError> {
        let http = crate::platform::client::build_http_client(&config)?;
        Ok(Self {
            platform: PlatformClient::with_http(http.clone(), &config),
            store: ObjectStoreClient::with_http(http),
            config,
        })
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub async fn execute(&self) -> Result<DeployReport, PipelineFailure> {
        Orchestrator::new(
            &self.config,
            &self.platform,
            &self.platform,
            &self.store,
            &self.platform,
        )
        .run()
        .await
    }
}
