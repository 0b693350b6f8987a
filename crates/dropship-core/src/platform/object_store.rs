//! Presigned-URL upload to object storage.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::wire::status_text;
use super::{ObjectStore, SSE_ALGORITHM, SSE_HEADER};
use crate::archive::Archive;
use crate::config::DeployConfig;
use crate::error::{ConfigError, RemoteFailure};
use crate::types::{ARCHIVE_CONTENT_TYPE, UploadCredential};

/// PUTs archives to presigned write URLs. Carries no credentials of its own.
#[derive(Debug, Clone)]
pub struct ObjectStoreClient {
    http: reqwest::Client,
}

impl ObjectStoreClient {
    pub fn new(config: &DeployConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: super::client::build_http_client(config)?,
        })
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ObjectStore for ObjectStoreClient {
    async fn put_archive(
        &self,
        credential: &UploadCredential,
        archive: &Archive,
    ) -> Result<(), RemoteFailure> {
        debug!(
            artifact = credential.artifact_id(),
            size = archive.size(),
            "Uploading archive"
        );

        let response = self
            .http
            .put(credential.write_url())
            .header(CONTENT_TYPE, ARCHIVE_CONTENT_TYPE)
            .header(SSE_HEADER, SSE_ALGORITHM)
            .body(archive.bytes().to_vec())
            .send()
            .await
            .map_err(|e| RemoteFailure::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteFailure::from_status(
                status.as_u16(),
                format!("{} {}", status.as_u16(), status_text(status)),
            ));
        }

        Ok(())
    }
}
