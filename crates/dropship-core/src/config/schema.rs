//! Configuration schema for dropship.toml
//!
//! The same structure is used for both layers:
//! - Global: ~/.config/dropship/dropship.toml
//! - Project: ./dropship.toml

use serde::{Deserialize, Serialize};

/// Root structure of a dropship.toml file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropshipToml {
    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub endpoints: EndpointsSection,

    #[serde(default)]
    pub retry: RetrySection,
}

/// `[deploy]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploySection {
    /// Project display name
    pub name: Option<String>,
    /// Project kind: production, development, or a service-defined kind
    pub kind: Option<String>,
    /// Build output directory, relative to the project root
    pub source_dir: Option<String>,
    /// Run provisioning and packaging concurrently
    pub parallel_packaging: Option<bool>,
    /// Delete a project created by this run when a later step fails
    pub cleanup_on_failure: Option<bool>,
    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

/// `[endpoints]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsSection {
    /// Upload broker and deployment trigger service
    pub service_url: Option<String>,
    /// Project management API
    pub platform_url: Option<String>,
}

/// `[retry]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
}

impl DropshipToml {
    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: DropshipToml) -> DropshipToml {
        DropshipToml {
            deploy: DeploySection {
                name: other.deploy.name.or(self.deploy.name),
                kind: other.deploy.kind.or(self.deploy.kind),
                source_dir: other.deploy.source_dir.or(self.deploy.source_dir),
                parallel_packaging: other
                    .deploy
                    .parallel_packaging
                    .or(self.deploy.parallel_packaging),
                cleanup_on_failure: other
                    .deploy
                    .cleanup_on_failure
                    .or(self.deploy.cleanup_on_failure),
                timeout_secs: other.deploy.timeout_secs.or(self.deploy.timeout_secs),
                user_agent: other.deploy.user_agent.or(self.deploy.user_agent),
            },
            endpoints: EndpointsSection {
                service_url: other.endpoints.service_url.or(self.endpoints.service_url),
                platform_url: other.endpoints.platform_url.or(self.endpoints.platform_url),
            },
            retry: RetrySection {
                max_attempts: other.retry.max_attempts.or(self.retry.max_attempts),
                initial_backoff_ms: other
                    .retry
                    .initial_backoff_ms
                    .or(self.retry.initial_backoff_ms),
                max_backoff_ms: other.retry.max_backoff_ms.or(self.retry.max_backoff_ms),
            },
        }
    }
}
