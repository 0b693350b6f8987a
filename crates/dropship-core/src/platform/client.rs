//! HTTP client for the project management and deployment service.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::wire::{
    self, CreateProjectRequest, CreateProjectResponse, DeployFromUrlRequest, DeploymentResponse,
    UploadUrlRequest, UploadUrlResponse,
};
use super::{CredentialBroker, DeploymentTrigger, ProjectProvisioner, USER_TOKEN_HEADER};
use crate::config::DeployConfig;
use crate::error::{ConfigError, RemoteFailure};
use crate::types::{
    Deployment, Project, ProjectKind, ProjectOrigin, UploadCredential, UploadRequest,
    UploadedArtifact,
};

/// Talks to the management service on behalf of one caller credential.
///
/// Provisioning goes to `platform_url`; credential negotiation and the
/// deployment trigger go to `service_url`.
#[derive(Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    service_url: String,
    platform_url: String,
    platform_api_key: String,
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("service_url", &self.service_url)
            .field("platform_url", &self.platform_url)
            .field("platform_api_key", &"[REDACTED]")
            .finish()
    }
}

impl PlatformClient {
    pub fn new(config: &DeployConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_http(build_http_client(config)?, config))
    }

    /// Reuse an existing HTTP client
    pub fn with_http(http: reqwest::Client, config: &DeployConfig) -> Self {
        Self {
            http,
            service_url: config.service_url.clone(),
            platform_url: config.platform_url.clone(),
            platform_api_key: config.platform_api_key.clone(),
        }
    }

    fn projects_url(&self) -> String {
        format!("{}/v1/projects", self.platform_url)
    }

    fn post(&self, url: &str, bearer: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", bearer))
            .header(USER_TOKEN_HEADER, &self.platform_api_key)
    }
}

/// Shared reqwest client with the configured timeout and user agent
pub fn build_http_client(config: &DeployConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| ConfigError::Invalid {
            field: "http_client",
            message: format!("Failed to build HTTP client: {}", e),
        })
}

#[async_trait]
impl ProjectProvisioner for PlatformClient {
    async fn create_project(
        &self,
        name: &str,
        kind: &ProjectKind,
    ) -> Result<Project, RemoteFailure> {
        let url = self.projects_url();
        debug!(%url, name, %kind, "Creating project");

        let response = self
            .post(&url, &self.platform_api_key)
            .json(&CreateProjectRequest {
                name,
                kind: kind.as_str(),
            })
            .send()
            .await
            .map_err(|e| RemoteFailure::transport(&e))?;

        let body: CreateProjectResponse = wire::read_json(response).await?;

        Ok(Project {
            id: body.id,
            api_key: body.api_key,
            name: body.name.unwrap_or_else(|| name.to_string()),
            kind: body.kind.map(ProjectKind::from).unwrap_or_else(|| kind.clone()),
            origin: ProjectOrigin::Created,
        })
    }

    async fn delete_project(&self, project: &Project) -> Result<(), RemoteFailure> {
        let url = format!("{}/{}", self.projects_url(), project.id);
        debug!(%url, "Deleting project");

        let response = self
            .http
            .delete(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.platform_api_key))
            .header(USER_TOKEN_HEADER, &self.platform_api_key)
            .send()
            .await
            .map_err(|e| RemoteFailure::transport(&e))?;

        if !response.status().is_success() {
            return Err(wire::failure_from_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialBroker for PlatformClient {
    async fn request_upload(
        &self,
        project: &Project,
        request: &UploadRequest,
    ) -> Result<UploadCredential, RemoteFailure> {
        let url = format!("{}/upload-url", self.service_url);
        debug!(%url, filename = %request.filename, "Requesting upload URL");

        let response = self
            .post(&url, &project.api_key)
            .json(&UploadUrlRequest {
                filename: &request.filename,
                content_type: &request.content_type,
                project_token: &project.api_key,
            })
            .send()
            .await
            .map_err(|e| RemoteFailure::transport(&e))?;

        let body: UploadUrlResponse = wire::read_json(response).await?;

        Ok(UploadCredential::new(
            body.upload_url,
            body.download_url,
            body.file_id,
            body.expires_in,
        ))
    }
}

#[async_trait]
impl DeploymentTrigger for PlatformClient {
    async fn trigger(
        &self,
        project: &Project,
        artifact: &UploadedArtifact,
    ) -> Result<Deployment, RemoteFailure> {
        let url = format!("{}/upload", self.service_url);
        debug!(%url, artifact = artifact.artifact_id(), "Triggering deployment");

        let response = self
            .post(&url, &project.api_key)
            .json(&DeployFromUrlRequest {
                url: artifact.read_url(),
                project_token: &project.id,
                use_project: true,
            })
            .send()
            .await
            .map_err(|e| RemoteFailure::transport(&e))?;

        let body: DeploymentResponse = wire::read_json(response).await?;

        Ok(Deployment {
            id: body.id,
            public_url: body.url,
        })
    }
}
