//! Sequences the deployment steps for a single run.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::{PipelineState, Stage, TransitionLog};
use crate::archive::{Archive, ArchiveBuilder};
use crate::config::DeployConfig;
use crate::error::{DeployError, PackagingError};
use crate::platform::{CredentialBroker, DeploymentTrigger, ObjectStore, ProjectProvisioner};
use crate::types::{Deployment, Project, ProjectOrigin, UploadRequest, UploadedArtifact};

/// Summary of the archive that was deployed
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub size: usize,
    pub digest: String,
    pub entries: Vec<String>,
}

impl From<&Archive> for ArchiveSummary {
    fn from(archive: &Archive) -> Self {
        Self {
            size: archive.size(),
            digest: archive.digest(),
            entries: archive.entry_names().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub deployment: Deployment,
    pub project: Project,
    pub archive: ArchiveSummary,
    pub artifact: UploadedArtifact,
    /// Negotiate+upload attempts made, at least 1
    pub upload_attempts: u32,
    pub transitions: Vec<PipelineState>,
}

impl DeployReport {
    pub fn public_url(&self) -> &str {
        &self.deployment.public_url
    }

    pub fn final_state(&self) -> PipelineState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(PipelineState::Done)
    }
}

/// What happened to a project created by a run that later failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// No cleanup was requested, or there was nothing this run created
    NotAttempted,
    Removed,
    Failed(String),
}

/// A run that ended in the `Failed` state
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: DeployError,
    /// Project in use when the run failed; survives unless cleanup removed it
    pub project: Option<Project>,
    pub cleanup: CleanupOutcome,
    pub transitions: Vec<PipelineState>,
}

impl PipelineFailure {
    pub fn final_state(&self) -> PipelineState {
        PipelineState::Failed { stage: self.stage }
    }

    /// Project created by this run and still present on the service
    pub fn orphaned_project(&self) -> Option<&Project> {
        self.project
            .as_ref()
            .filter(|p| p.origin == ProjectOrigin::Created && self.cleanup != CleanupOutcome::Removed)
    }
}

/// Runs provisioning, packaging, credential negotiation, upload, and trigger
/// in that order against the given collaborators.
pub struct Orchestrator<'a> {
    config: &'a DeployConfig,
    provisioner: &'a dyn ProjectProvisioner,
    broker: &'a dyn CredentialBroker,
    store: &'a dyn ObjectStore,
    trigger: &'a dyn DeploymentTrigger,
    upload_request: UploadRequest,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a DeployConfig,
        provisioner: &'a dyn ProjectProvisioner,
        broker: &'a dyn CredentialBroker,
        store: &'a dyn ObjectStore,
        trigger: &'a dyn DeploymentTrigger,
    ) -> Self {
        Self {
            config,
            provisioner,
            broker,
            store,
            trigger,
            upload_request: UploadRequest::default(),
        }
    }

    pub fn with_upload_request(mut self, request: UploadRequest) -> Self {
        self.upload_request = request;
        self
    }

    /// Execute one run. Every call provisions (or reuses) its own project and
    /// negotiates its own credentials; nothing carries over between runs.
    pub async fn run(&self) -> Result<DeployReport, PipelineFailure> {
        let mut log = TransitionLog::new();

        let builder = ArchiveBuilder::new(self.config.source_dir.clone());
        log.enter(Stage::Provisioning);

        // Packaging is logged only after provisioning resolves, in either mode.
        let (provisioned, packaged) = if self.config.parallel_packaging {
            tokio::join!(self.provision(), package_blocking(builder))
        } else {
            match self.provision().await {
                Ok(project) => (Ok(project), package_blocking(builder).await),
                Err(err) => return Err(self.fail(log, Stage::Provisioning, err, None).await),
            }
        };

        let project = match provisioned {
            Ok(project) => project,
            Err(err) => {
                if let Err(packaging) = &packaged {
                    debug!(error = %packaging, "Packaging also failed");
                }
                return Err(self.fail(log, Stage::Provisioning, err, None).await);
            }
        };

        log.enter(Stage::Packaging);
        let archive = match packaged {
            Ok(archive) => archive,
            Err(err) => {
                return Err(self.fail(log, Stage::Packaging, err.into(), Some(project)).await);
            }
        };

        info!(
            size_kb = archive.size().div_ceil(1024),
            entries = ?archive.entry_names(),
            digest = %archive.digest(),
            "Archive created"
        );

        let uploaded = self.upload(&mut log, &project, &archive).await;
        let (artifact, upload_attempts) = match uploaded {
            Ok(uploaded) => uploaded,
            Err((stage, err)) => return Err(self.fail(log, stage, err, Some(project)).await),
        };

        log.enter(Stage::Triggering);
        let deployment = match self.trigger.trigger(&project, &artifact).await {
            Ok(deployment) => deployment,
            Err(failure) => {
                let err = DeployError::Deployment(failure);
                return Err(self.fail(log, Stage::Triggering, err, Some(project)).await);
            }
        };

        log.done();
        info!(
            deployment = %deployment.id,
            url = %deployment.public_url,
            project = %project.id,
            "Deployed successfully"
        );

        Ok(DeployReport {
            deployment,
            project,
            archive: ArchiveSummary::from(&archive),
            artifact,
            upload_attempts,
            transitions: log.into_history(),
        })
    }

    async fn provision(&self) -> Result<Project, DeployError> {
        if let Some(existing) = &self.config.existing_project {
            info!(project = %existing.id, "Using existing project");
            return Ok(Project {
                id: existing.id.clone(),
                api_key: existing.api_key.clone(),
                name: self.config.project_name.clone(),
                kind: self.config.project_kind.clone(),
                origin: ProjectOrigin::Existing,
            });
        }

        info!(name = %self.config.project_name, kind = %self.config.project_kind, "Creating project");
        let project = self
            .provisioner
            .create_project(&self.config.project_name, &self.config.project_kind)
            .await
            .map_err(DeployError::Service)?;
        info!(project = %project.id, "Project created");
        Ok(project)
    }

    /// Negotiate a credential and upload, retrying transient failures within
    /// the policy. Each attempt negotiates a fresh credential.
    async fn upload(
        &self,
        log: &mut TransitionLog,
        project: &Project,
        archive: &Archive,
    ) -> Result<(UploadedArtifact, u32), (Stage, DeployError)> {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let delay = policy.backoff_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            log.enter(Stage::CredentialNegotiation);
            let credential = match self
                .broker
                .request_upload(project, &self.upload_request)
                .await
            {
                Ok(credential) => credential,
                Err(failure) => {
                    let err = DeployError::UploadCredential(failure);
                    if err.is_retryable() && attempt < policy.max_attempts {
                        warn!(attempt, error = %err, "Retrying credential negotiation");
                        continue;
                    }
                    return Err((Stage::CredentialNegotiation, err));
                }
            };
            info!(
                artifact = credential.artifact_id(),
                expires_in = credential.expires_in_secs(),
                "Upload URL obtained"
            );

            log.enter(Stage::Uploading);
            if credential.is_expired_at(Utc::now()) {
                warn!(
                    artifact = credential.artifact_id(),
                    expired_at = %credential.expires_at(),
                    "Upload credential is past its advisory expiry"
                );
            }

            match self.store.put_archive(&credential, archive).await {
                Ok(()) => {
                    info!(artifact = credential.artifact_id(), "Archive uploaded");
                    return Ok((credential.into_uploaded(), attempt));
                }
                Err(failure) => {
                    let err = DeployError::Upload(failure);
                    if err.is_retryable() && attempt < policy.max_attempts {
                        warn!(attempt, error = %err, "Retrying upload with a fresh credential");
                        continue;
                    }
                    return Err((Stage::Uploading, err));
                }
            }
        }
    }

    async fn fail(
        &self,
        mut log: TransitionLog,
        stage: Stage,
        error: DeployError,
        project: Option<Project>,
    ) -> PipelineFailure {
        log.fail(stage);
        warn!(stage = %stage, error = %error, "Deployment run failed");

        let cleanup = match &project {
            Some(p) if p.origin == ProjectOrigin::Created && self.config.cleanup_on_failure => {
                match self.provisioner.delete_project(p).await {
                    Ok(()) => {
                        info!(project = %p.id, "Removed project created by failed run");
                        CleanupOutcome::Removed
                    }
                    Err(failure) => {
                        warn!(project = %p.id, error = %failure, "Failed to remove project");
                        CleanupOutcome::Failed(failure.message)
                    }
                }
            }
            Some(p) if p.origin == ProjectOrigin::Created => {
                warn!(project = %p.id, "Project created by this run was left in place");
                CleanupOutcome::NotAttempted
            }
            _ => CleanupOutcome::NotAttempted,
        };

        debug_assert_eq!(log.current(), PipelineState::Failed { stage });
        PipelineFailure {
            stage,
            error,
            project,
            cleanup,
            transitions: log.into_history(),
        }
    }
}

async fn package_blocking(builder: ArchiveBuilder) -> Result<Archive, PackagingError> {
    tokio::task::spawn_blocking(move || builder.build())
        .await
        .map_err(|e| PackagingError::Interrupted(e.to_string()))?
}
