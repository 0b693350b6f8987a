//! Remote collaborators of the deployment pipeline
//!
//! Each pipeline step talks to the outside world through one trait so the
//! orchestrator can be driven by the HTTP clients in production and by
//! in-memory fakes in tests.
//!
//! - [`ProjectProvisioner`]: creates (and optionally removes) projects
//! - [`CredentialBroker`]: issues presigned upload/download URL pairs
//! - [`ObjectStore`]: receives the archive bytes
//! - [`DeploymentTrigger`]: materializes a deployment from an uploaded artifact
//!
//! Implementations report failures as [`RemoteFailure`]; the orchestrator
//! classifies them by stage.

pub mod client;
pub mod object_store;
pub mod wire;

pub use client::PlatformClient;
pub use object_store::ObjectStoreClient;

use async_trait::async_trait;

use crate::archive::Archive;
use crate::error::RemoteFailure;
use crate::types::{Deployment, Project, ProjectKind, UploadCredential, UploadRequest, UploadedArtifact};

/// Header carrying the caller-level credential next to the bearer token.
pub const USER_TOKEN_HEADER: &str = "x-user-token";

/// Server-side encryption directive sent with every archive upload.
pub const SSE_HEADER: &str = "x-amz-server-side-encryption";
pub const SSE_ALGORITHM: &str = "AES256";

#[async_trait]
pub trait ProjectProvisioner: Send + Sync {
    /// Create a new project. Not idempotent: every call creates a resource.
    async fn create_project(&self, name: &str, kind: &ProjectKind)
    -> Result<Project, RemoteFailure>;

    /// Remove a project created earlier in the same run.
    async fn delete_project(&self, project: &Project) -> Result<(), RemoteFailure>;
}

#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn request_upload(
        &self,
        project: &Project,
        request: &UploadRequest,
    ) -> Result<UploadCredential, RemoteFailure>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Single PUT of the whole archive to the credential's write URL.
    async fn put_archive(
        &self,
        credential: &UploadCredential,
        archive: &Archive,
    ) -> Result<(), RemoteFailure>;
}

#[async_trait]
pub trait DeploymentTrigger: Send + Sync {
    async fn trigger(
        &self,
        project: &Project,
        artifact: &UploadedArtifact,
    ) -> Result<Deployment, RemoteFailure>;
}
