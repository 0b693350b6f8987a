//! Dropship - static app deployer
//!
//! Usage:
//!   dropship deploy            # Package ./public and deploy it
//!   dropship package --out F   # Build the archive only
//!   dropship config            # Show resolved configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dropship_core::commands::{DeployCommand, PackageCommand, PackageOptions, PackageReport};
use dropship_core::config::{ConfigLoader, ConfigOverrides, ConfigSummary};
use dropship_core::pipeline::{CleanupOutcome, DeployReport, PipelineFailure};
use dropship_core::types::{ProjectKind, ProjectOrigin};

#[derive(Parser)]
#[command(name = "dropship")]
#[command(about = "Package and deploy static web builds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package build output, upload it, and trigger a deployment
    ///
    /// Requires SUBSCRIBE_DEV_PLATFORM_API_KEY in the environment.
    Deploy(Box<DeployArgs>),

    /// Build the deployment archive without uploading it
    Package {
        /// Build output directory (default: ./public or [deploy].source_dir)
        #[arg(long, short)]
        dir: Option<PathBuf>,
        /// Where to write the zip file
        #[arg(long, short)]
        out: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the resolved configuration (secrets redacted)
    Config {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable text
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct DeployArgs {
    /// Build output directory (default: ./public)
    #[arg(long, short)]
    dir: Option<PathBuf>,
    /// Project name (default: package.json name)
    #[arg(long, short)]
    name: Option<String>,
    /// Project kind (production, development, ...)
    #[arg(long, short)]
    kind: Option<String>,
    /// Deploy into an existing project instead of creating one
    #[arg(long, requires = "project_key")]
    project_id: Option<String>,
    /// Scoped API key of the existing project
    #[arg(long, requires = "project_id")]
    project_key: Option<String>,
    /// Provision the project and package the build concurrently
    #[arg(long)]
    parallel: bool,
    /// Delete the project this run created if a later step fails
    #[arg(long)]
    cleanup_on_failure: bool,
    /// Total attempts for credential negotiation + upload on transient errors
    #[arg(long, value_name = "N")]
    retries: Option<u32>,
    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropship=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy(args) => run_deploy(*args, ConfigLoader::from_process()?).await,
        Commands::Package { dir, out, format } => run_package(dir, out, format),
        Commands::Config { format } => run_config(format),
    }
}

async fn run_deploy(args: DeployArgs, loader: ConfigLoader) -> Result<()> {
    let mut overrides = ConfigOverrides::new()
        .with_existing_project(args.project_id.clone(), args.project_key.clone());
    if let Some(dir) = &args.dir {
        overrides = overrides.with_source_dir(dir);
    }
    if let Some(name) = &args.name {
        overrides = overrides.with_project_name(name);
    }
    if let Some(kind) = &args.kind {
        overrides = overrides.with_project_kind(ProjectKind::from(kind.clone()));
    }
    if args.parallel {
        overrides = overrides.with_parallel_packaging(true);
    }
    if args.cleanup_on_failure {
        overrides = overrides.with_cleanup_on_failure(true);
    }
    if let Some(n) = args.retries {
        overrides = overrides.with_max_attempts(n);
    }

    // Configuration errors surface here, before any network activity
    let config = loader.with_overrides(overrides).load()?;
    debug!(?config, "Starting deployment");
    let cmd = DeployCommand::new(config)?;

    match cmd.execute().await {
        Ok(report) => print_deploy_result(args.format, &report),
        Err(failure) => {
            print_deploy_failure(args.format, &failure)?;
            Err(anyhow::Error::new(failure))
        }
    }
}

fn print_deploy_result(format: OutputFormat, report: &DeployReport) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("✓ Deployed successfully");
            println!("  URL:             {}", report.deployment.public_url);
            match report.project.origin {
                ProjectOrigin::Existing => {
                    println!("  Project ID:      {} (reused)", report.project.id)
                }
                ProjectOrigin::Created => println!("  Project ID:      {}", report.project.id),
            }
            println!("  Project API Key: {}", report.project.api_key);
            println!(
                "  Archive:         {} KB ({})",
                report.archive.size.div_ceil(1024),
                report.archive.entries.join(", ")
            );
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "status": "done",
                "url": report.deployment.public_url,
                "deployment_id": report.deployment.id,
                "project_id": report.project.id,
                "project_origin": report.project.origin,
                "project_api_key": report.project.api_key,
                "archive": report.archive,
                "upload_attempts": report.upload_attempts,
                "transitions": report.transitions,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_deploy_failure(format: OutputFormat, failure: &PipelineFailure) -> Result<()> {
    match format {
        OutputFormat::Table => {
            eprintln!("✗ Deployment failed during {}", failure.stage);
            if let Some(project) = failure.orphaned_project() {
                eprintln!("  ⚠ Project {} was created and left in place", project.id);
            }
            if let CleanupOutcome::Failed(message) = &failure.cleanup {
                eprintln!("  ⚠ Cleanup failed: {}", message);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "status": "failed",
                "stage": failure.stage,
                "kind": failure.error.kind().as_str(),
                "error": failure.error.to_string(),
                "http_status": failure.error.remote().and_then(|r| r.status),
                "project_id": failure.project.as_ref().map(|p| &p.id),
                "cleanup": failure.cleanup,
                "transitions": failure.transitions,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn run_package(dir: Option<PathBuf>, out: PathBuf, format: OutputFormat) -> Result<()> {
    let source_dir = match dir {
        Some(dir) => dir,
        None => ConfigLoader::from_process()?.source_dir()?,
    };

    let report = PackageCommand::new()
        .execute(&PackageOptions::new(&source_dir, &out))
        .with_context(|| format!("Failed to package {}", source_dir.display()))?;

    print_package_result(format, &report)
}

fn print_package_result(format: OutputFormat, report: &PackageReport) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if report.entries.is_empty() {
                println!("⚠ No build output found; wrote an empty archive");
            }
            println!(
                "✓ Wrote {} ({} KB)",
                report.output.display(),
                report.size.div_ceil(1024)
            );
            for entry in &report.entries {
                println!("  {}", entry);
            }
            println!("  blake3: {}", report.digest);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

fn run_config(format: OutputFormat) -> Result<()> {
    let summary = ConfigLoader::from_process()?.summary()?;
    print_config(format, &summary)
}

fn print_config(format: OutputFormat, summary: &ConfigSummary) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("Service URL:        {}", summary.service_url);
            println!("Platform URL:       {}", summary.platform_url);
            println!("Project name:       {}", summary.project_name);
            println!("Project kind:       {}", summary.project_kind);
            println!("Source dir:         {}", summary.source_dir.display());
            if let Some(id) = &summary.existing_project_id {
                println!("Existing project:   {}", id);
            }
            println!("Parallel packaging: {}", summary.parallel_packaging);
            println!("Cleanup on failure: {}", summary.cleanup_on_failure);
            println!("Max attempts:       {}", summary.retry_max_attempts);
            println!("Timeout:            {}s", summary.timeout_secs);
            println!("User agent:         {}", summary.user_agent);
            println!(
                "API key:            {}",
                if summary.api_key_set { "set" } else { "missing" }
            );
            for file in &summary.config_files {
                println!("Loaded:             {}", file.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}
