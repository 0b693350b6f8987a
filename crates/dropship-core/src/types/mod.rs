//! Domain types shared by the pipeline steps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Filename the archive is registered under with the upload broker.
pub const ARCHIVE_FILENAME: &str = "bundle.zip";

/// Content type of the uploaded archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Upper bound applied to service-supplied expiry windows (one year).
const MAX_ADVISORY_EXPIRY_SECS: u64 = 365 * 24 * 60 * 60;

/// Deployment kind requested when provisioning a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectKind {
    #[default]
    Production,
    Development,
    /// Any other kind the service understands, passed through verbatim.
    Other(String),
}

impl ProjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectKind::Production => "production",
            ProjectKind::Development => "development",
            ProjectKind::Other(kind) => kind,
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProjectKind {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => ProjectKind::Production,
            "development" | "dev" => ProjectKind::Development,
            _ => ProjectKind::Other(value),
        }
    }
}

impl From<ProjectKind> for String {
    fn from(kind: ProjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ProjectKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ProjectKind::from(s.to_string()))
    }
}

/// Where the run's project came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectOrigin {
    /// Provisioned by this run.
    Created,
    /// Supplied by the caller; never cleaned up by the pipeline.
    Existing,
}

/// A deployment target on the management service.
#[derive(Clone, Serialize)]
pub struct Project {
    pub id: String,
    /// Project-scoped credential used for every call after provisioning.
    pub api_key: String,
    pub name: String,
    pub kind: ProjectKind,
    pub origin: ProjectOrigin,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("api_key", &"[REDACTED]")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .finish()
    }
}

/// What the broker is asked to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
}

impl Default for UploadRequest {
    fn default() -> Self {
        Self {
            filename: ARCHIVE_FILENAME.to_string(),
            content_type: ARCHIVE_CONTENT_TYPE.to_string(),
        }
    }
}

/// Presigned write/read URL pair for a single upload.
///
/// Not `Clone`: the orchestrator consumes it when the upload succeeds, so one
/// credential backs at most one upload.
#[derive(Debug)]
pub struct UploadCredential {
    write_url: String,
    read_url: String,
    artifact_id: String,
    expires_in_secs: u64,
    issued_at: DateTime<Utc>,
}

impl UploadCredential {
    pub fn new(
        write_url: impl Into<String>,
        read_url: impl Into<String>,
        artifact_id: impl Into<String>,
        expires_in_secs: u64,
    ) -> Self {
        Self {
            write_url: write_url.into(),
            read_url: read_url.into(),
            artifact_id: artifact_id.into(),
            expires_in_secs,
            issued_at: Utc::now(),
        }
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    pub fn read_url(&self) -> &str {
        &self.read_url
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in_secs
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Advisory expiry; only the object store enforces it.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = self.expires_in_secs.min(MAX_ADVISORY_EXPIRY_SECS) as i64;
        self.issued_at + Duration::seconds(secs)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Turn the credential into proof of a completed upload.
    pub(crate) fn into_uploaded(self) -> UploadedArtifact {
        UploadedArtifact {
            read_url: self.read_url,
            artifact_id: self.artifact_id,
        }
    }
}

/// An archive that has been written to object storage during this run.
///
/// Only the orchestrator can create one, after the upload step succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedArtifact {
    read_url: String,
    artifact_id: String,
}

impl UploadedArtifact {
    pub fn read_url(&self) -> &str {
        &self.read_url
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }
}

/// A live deployment returned by the trigger step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub public_url: String,
}
