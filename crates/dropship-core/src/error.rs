//! Error taxonomy for the deployment pipeline.
//!
//! Every pipeline step maps its failures onto one [`DeployError`] variant so
//! callers can tell which stage broke without string matching. Remote calls
//! carry a [`RemoteFailure`] with the HTTP status (when one was received) and
//! the most specific message the service supplied.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration problems detected before any I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    MissingCredential(&'static str),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Existing project requires both an id and an API key")]
    IncompleteProject,

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Failures while building the upload archive.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to add {name} to archive: {source}")]
    Zip {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to write archive to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Packaging task did not complete: {0}")]
    Interrupted(String),
}

/// A non-success outcome from a remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    /// HTTP status, absent for transport errors.
    pub status: Option<u16>,
    pub message: String,
    /// Whether repeating the same request may succeed.
    pub retryable: bool,
}

impl RemoteFailure {
    /// Classify a response status and the message extracted from its body.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            retryable: status == 429 || (500..600).contains(&status),
        }
    }

    /// A request that never produced a response.
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            status: None,
            message: err.to_string(),
            retryable: err.is_timeout() || err.is_connect(),
        }
    }

    /// A success response whose body could not be understood.
    pub fn malformed(status: u16, err: impl fmt::Display) -> Self {
        Self {
            status: Some(status),
            message: format!("unexpected response body: {err}"),
            retryable: false,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Terminal error of a deployment run, classified by the step that failed.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to package build output: {0}")]
    Packaging(#[from] PackagingError),

    #[error("Failed to create project: {0}")]
    Service(RemoteFailure),

    #[error("Failed to get upload URL: {0}")]
    UploadCredential(RemoteFailure),

    #[error("Failed to upload archive: {0}")]
    Upload(RemoteFailure),

    #[error("Deployment failed: {0}")]
    Deployment(RemoteFailure),
}

/// Stable names for [`DeployError`] variants, used in machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Packaging,
    Service,
    UploadCredential,
    Upload,
    Deployment,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Packaging => "packaging",
            ErrorKind::Service => "service",
            ErrorKind::UploadCredential => "upload_credential",
            ErrorKind::Upload => "upload",
            ErrorKind::Deployment => "deployment",
        }
    }
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Configuration(_) => ErrorKind::Configuration,
            DeployError::Packaging(_) => ErrorKind::Packaging,
            DeployError::Service(_) => ErrorKind::Service,
            DeployError::UploadCredential(_) => ErrorKind::UploadCredential,
            DeployError::Upload(_) => ErrorKind::Upload,
            DeployError::Deployment(_) => ErrorKind::Deployment,
        }
    }

    /// The remote failure behind this error, if it came from a service call.
    pub fn remote(&self) -> Option<&RemoteFailure> {
        match self {
            DeployError::Service(f)
            | DeployError::UploadCredential(f)
            | DeployError::Upload(f)
            | DeployError::Deployment(f) => Some(f),
            DeployError::Configuration(_) | DeployError::Packaging(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.remote().is_some_and(|f| f.retryable)
    }
}
