//! Dropship Core Library
//!
//! Provides the deployment pipeline for static web builds: packaging build
//! output into a zip archive, provisioning a remote project, negotiating a
//! presigned upload, pushing the archive to object storage, and triggering a
//! deployment from the uploaded artifact.

pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{DeployConfig, ExistingProject, RetryPolicy};

    // Errors
    pub use crate::error::{ConfigError, DeployError, PackagingError, RemoteFailure};

    // Archive
    pub use crate::archive::{Archive, ArchiveBuilder, ArchiveEntry};

    // Pipeline
    pub use crate::pipeline::{
        CleanupOutcome, DeployReport, Orchestrator, PipelineFailure, PipelineState, Stage,
    };

    // Platform
    pub use crate::platform::{
        CredentialBroker, DeploymentTrigger, ObjectStore, ObjectStoreClient, PlatformClient,
        ProjectProvisioner,
    };

    // Domain types
    pub use crate::types::{
        Deployment, Project, ProjectKind, UploadCredential, UploadRequest, UploadedArtifact,
    };
}
