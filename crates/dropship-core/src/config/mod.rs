//! Deployment configuration
//!
//! A [`DeployConfig`] is resolved once at process start and passed by
//! reference into the pipeline; no component reads the environment itself.
//!
//! Precedence, highest first:
//! - Explicit overrides (CLI flags)
//! - Environment variables
//! - Project config: ./dropship.toml
//! - Global config: ~/.config/dropship/dropship.toml
//! - Built-in defaults

pub mod parser;
pub mod paths;
pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

pub use crate::pipeline::retry::RetryPolicy;
pub use parser::{parse_dropship_toml, parse_dropship_toml_str};
pub use paths::{CONFIG_FILE_NAME, default_global_config_dir};
pub use schema::DropshipToml;

use crate::error::ConfigError;
use crate::types::ProjectKind;

/// Caller-level credential for the management service
pub const API_KEY_ENV: &str = "SUBSCRIBE_DEV_PLATFORM_API_KEY";
pub const SERVICE_URL_ENV: &str = "DROPSHIP_SERVICE_URL";
pub const PLATFORM_URL_ENV: &str = "DROPSHIP_PLATFORM_URL";
pub const PROJECT_ID_ENV: &str = "DROPSHIP_PROJECT_ID";
pub const PROJECT_API_KEY_ENV: &str = "DROPSHIP_PROJECT_API_KEY";

pub const DEFAULT_SERVICE_URL: &str = "https://apps.subscribe.dev";
pub const DEFAULT_PLATFORM_URL: &str = "https://api.subscribe.dev";
pub const DEFAULT_PROJECT_NAME: &str = "bun-app";
pub const DEFAULT_SOURCE_DIR: &str = "public";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub fn default_user_agent() -> String {
    format!("dropship/{}", env!("CARGO_PKG_VERSION"))
}

/// A project to deploy into instead of provisioning a new one
#[derive(Clone, PartialEq, Eq)]
pub struct ExistingProject {
    pub id: String,
    pub api_key: String,
}

impl fmt::Debug for ExistingProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExistingProject")
            .field("id", &self.id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Fully resolved settings for one deployment run
#[derive(Clone)]
pub struct DeployConfig {
    /// Top-level credential, also sent as the user token header
    pub platform_api_key: String,
    /// Base URL of the upload broker / deployment trigger service
    pub service_url: String,
    /// Base URL of the project management API
    pub platform_url: String,
    pub project_name: String,
    pub project_kind: ProjectKind,
    /// Directory holding `index.html` and `bundle.js`
    pub source_dir: PathBuf,
    pub existing_project: Option<ExistingProject>,
    pub parallel_packaging: bool,
    pub cleanup_on_failure: bool,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("platform_api_key", &"[REDACTED]")
            .field("service_url", &self.service_url)
            .field("platform_url", &self.platform_url)
            .field("project_name", &self.project_name)
            .field("project_kind", &self.project_kind)
            .field("source_dir", &self.source_dir)
            .field("existing_project", &self.existing_project)
            .field("parallel_packaging", &self.parallel_packaging)
            .field("cleanup_on_failure", &self.cleanup_on_failure)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl DeployConfig {
    /// Create a config with built-in defaults
    pub fn new(platform_api_key: impl Into<String>) -> Self {
        Self {
            platform_api_key: platform_api_key.into(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            platform_url: DEFAULT_PLATFORM_URL.to_string(),
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            project_kind: ProjectKind::default(),
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            existing_project: None,
            parallel_packaging: false,
            cleanup_on_failure: false,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = trim_base(url.into());
        self
    }

    pub fn with_platform_url(mut self, url: impl Into<String>) -> Self {
        self.platform_url = trim_base(url.into());
        self
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn with_project_kind(mut self, kind: ProjectKind) -> Self {
        self.project_kind = kind;
        self
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_existing_project(mut self, id: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.existing_project = Some(ExistingProject {
            id: id.into(),
            api_key: api_key.into(),
        });
        self
    }

    pub fn with_parallel_packaging(mut self, parallel: bool) -> Self {
        self.parallel_packaging = parallel;
        self
    }

    pub fn with_cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = cleanup;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Environment variables relevant to configuration, captured once
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub api_key: Option<String>,
    pub service_url: Option<String>,
    pub platform_url: Option<String>,
    pub project_id: Option<String>,
    pub project_api_key: Option<String>,
}

impl EnvSnapshot {
    /// Read the process environment; empty values count as unset
    pub fn capture() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: var(API_KEY_ENV),
            service_url: var(SERVICE_URL_ENV),
            platform_url: var(PLATFORM_URL_ENV),
            project_id: var(PROJECT_ID_ENV),
            project_api_key: var(PROJECT_API_KEY_ENV),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Values supplied explicitly by the caller, e.g. CLI flags
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_dir: Option<PathBuf>,
    pub project_name: Option<String>,
    pub project_kind: Option<ProjectKind>,
    pub existing_project_id: Option<String>,
    pub existing_project_key: Option<String>,
    pub parallel_packaging: Option<bool>,
    pub cleanup_on_failure: Option<bool>,
    pub max_attempts: Option<u32>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_project_kind(mut self, kind: ProjectKind) -> Self {
        self.project_kind = Some(kind);
        self
    }

    pub fn with_existing_project(
        mut self,
        id: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        self.existing_project_id = id;
        self.existing_project_key = api_key;
        self
    }

    pub fn with_parallel_packaging(mut self, parallel: bool) -> Self {
        self.parallel_packaging = Some(parallel);
        self
    }

    pub fn with_cleanup_on_failure(mut self, cleanup: bool) -> Self {
        self.cleanup_on_failure = Some(cleanup);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// Redacted view of the resolved configuration
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub service_url: String,
    pub platform_url: String,
    pub project_name: String,
    pub project_kind: String,
    pub source_dir: PathBuf,
    pub existing_project_id: Option<String>,
    pub parallel_packaging: bool,
    pub cleanup_on_failure: bool,
    pub retry_max_attempts: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub api_key_set: bool,
    pub config_files: Vec<PathBuf>,
}

/// Resolves a [`DeployConfig`] from files, environment, and overrides
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    project_root: PathBuf,
    global_config_dir: Option<PathBuf>,
    env: EnvSnapshot,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Loader rooted at `project_root` with no global config and an empty environment
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            global_config_dir: None,
            env: EnvSnapshot::default(),
            overrides: ConfigOverrides::default(),
        }
    }

    /// Loader for the current process: working directory, user config dir, real environment
    pub fn from_process() -> Result<Self, ConfigError> {
        let project_root = std::env::current_dir().map_err(|e| ConfigError::Invalid {
            field: "project_root",
            message: e.to_string(),
        })?;
        let mut loader = Self::new(project_root).with_env(EnvSnapshot::capture());
        loader.global_config_dir = default_global_config_dir();
        Ok(loader)
    }

    pub fn with_global_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_config_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = env;
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve the full config. Fails first on a missing credential.
    pub fn load(&self) -> Result<DeployConfig, ConfigError> {
        let api_key = self
            .env
            .api_key
            .clone()
            .ok_or(ConfigError::MissingCredential(API_KEY_ENV))?;
        let (config, _) = self.resolve(api_key)?;
        Ok(config)
    }

    /// Resolve only the build output directory; needs no credential.
    pub fn source_dir(&self) -> Result<PathBuf, ConfigError> {
        let (file, _) = self.file_layers()?;
        Ok(self.resolve_source_dir(&file))
    }

    /// Resolve everything except the credential, for display.
    pub fn summary(&self) -> Result<ConfigSummary, ConfigError> {
        let (config, config_files) =
            self.resolve(self.env.api_key.clone().unwrap_or_default())?;
        Ok(ConfigSummary {
            service_url: config.service_url,
            platform_url: config.platform_url,
            project_name: config.project_name,
            project_kind: config.project_kind.to_string(),
            source_dir: config.source_dir,
            existing_project_id: config.existing_project.map(|p| p.id),
            parallel_packaging: config.parallel_packaging,
            cleanup_on_failure: config.cleanup_on_failure,
            retry_max_attempts: config.retry.max_attempts,
            timeout_secs: config.request_timeout.as_secs(),
            user_agent: config.user_agent,
            api_key_set: self.env.api_key.is_some(),
            config_files,
        })
    }

    fn resolve(&self, api_key: String) -> Result<(DeployConfig, Vec<PathBuf>), ConfigError> {
        let (file, config_files) = self.file_layers()?;
        let defaults = RetryPolicy::default();

        let service_url = parse_endpoint(
            "service_url",
            self.env
                .service_url
                .as_deref()
                .or(file.endpoints.service_url.as_deref())
                .unwrap_or(DEFAULT_SERVICE_URL),
        )?;
        let platform_url = parse_endpoint(
            "platform_url",
            self.env
                .platform_url
                .as_deref()
                .or(file.endpoints.platform_url.as_deref())
                .unwrap_or(DEFAULT_PLATFORM_URL),
        )?;

        let project_name = self
            .overrides
            .project_name
            .clone()
            .or_else(|| file.deploy.name.clone())
            .or_else(|| read_package_name(&self.project_root))
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
        if project_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                message: "project name must not be empty".to_string(),
            });
        }

        let project_kind = self
            .overrides
            .project_kind
            .clone()
            .or_else(|| file.deploy.kind.clone().map(ProjectKind::from))
            .unwrap_or_default();

        let existing_project = resolve_existing_project(
            self.overrides
                .existing_project_id
                .clone()
                .or_else(|| self.env.project_id.clone()),
            self.overrides
                .existing_project_key
                .clone()
                .or_else(|| self.env.project_api_key.clone()),
        )?;

        let max_attempts = self
            .overrides
            .max_attempts
            .or(file.retry.max_attempts)
            .unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        let retry = RetryPolicy {
            max_attempts,
            initial_backoff: file
                .retry
                .initial_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: file
                .retry
                .max_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
        };

        let timeout_secs = file.deploy.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "deploy.timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        let config = DeployConfig {
            platform_api_key: api_key,
            service_url,
            platform_url,
            project_name,
            project_kind,
            source_dir: self.resolve_source_dir(&file),
            existing_project,
            parallel_packaging: self
                .overrides
                .parallel_packaging
                .or(file.deploy.parallel_packaging)
                .unwrap_or(false),
            cleanup_on_failure: self
                .overrides
                .cleanup_on_failure
                .or(file.deploy.cleanup_on_failure)
                .unwrap_or(false),
            retry,
            request_timeout: Duration::from_secs(timeout_secs),
            user_agent: file.deploy.user_agent.clone().unwrap_or_else(default_user_agent),
        };

        debug!(?config, "Resolved deploy configuration");
        Ok((config, config_files))
    }

    fn resolve_source_dir(&self, file: &DropshipToml) -> PathBuf {
        let dir = self
            .overrides
            .source_dir
            .clone()
            .or_else(|| file.deploy.source_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));
        self.project_root.join(dir)
    }

    /// Global then project dropship.toml, merged
    fn file_layers(&self) -> Result<(DropshipToml, Vec<PathBuf>), ConfigError> {
        let mut merged = DropshipToml::default();
        let mut loaded = Vec::new();

        let global = self
            .global_config_dir
            .as_deref()
            .map(paths::global_config_path);
        let project = Some(paths::project_config_path(&self.project_root));

        for path in [global, project].into_iter().flatten() {
            if let Some(layer) = parse_dropship_toml(&path)? {
                merged = merged.merge(layer);
                loaded.push(path);
            }
        }

        Ok((merged, loaded))
    }
}

fn resolve_existing_project(
    id: Option<String>,
    api_key: Option<String>,
) -> Result<Option<ExistingProject>, ConfigError> {
    match (id, api_key) {
        (Some(id), Some(api_key)) => Ok(Some(ExistingProject { id, api_key })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::IncompleteProject),
    }
}

/// Validate an http(s) base URL and strip its trailing slash
fn parse_endpoint(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field,
            message: format!("unsupported scheme '{}' in {}", url.scheme(), value),
        });
    }
    Ok(trim_base(url.to_string()))
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// `name` from package.json, if present and readable
fn read_package_name(project_root: &Path) -> Option<String> {
    let path = project_root.join("package.json");
    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(json) => json
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "Ignoring unparseable package.json");
            None
        }
    }
}
