//! High-level commands for dropship operations.
//!
//! These wire configuration, HTTP clients, and the pipeline together and are
//! what the CLI frontend calls.

pub mod deploy;
pub mod package;

pub use deploy::DeployCommand;
pub use package::{PackageCommand, PackageOptions, PackageReport};
