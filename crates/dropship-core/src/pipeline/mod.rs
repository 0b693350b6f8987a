//! Deployment pipeline orchestration
//!
//! A run moves through `Provisioning → Packaging → CredentialNegotiation →
//! Uploading → Triggering → Done`. The first failure ends the run in
//! `Failed { stage }`; no later step executes. Provisioning and packaging
//! have no data dependency and may run concurrently when configured.

pub mod orchestrator;
pub mod retry;
pub mod state;

pub use orchestrator::{ArchiveSummary, CleanupOutcome, DeployReport, Orchestrator, PipelineFailure};
pub use retry::RetryPolicy;
pub use state::{PipelineState, Stage};
