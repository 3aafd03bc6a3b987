//! Build command handler
//!
//! Fetches the version list (unless versions are given explicitly), runs the
//! matrix build, and prints which versions failed.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use vmatrix_client::CatalogClient;
use vmatrix_core::domain::version::VersionId;
use vmatrix_runner::engine::check_engine_available;
use vmatrix_runner::{EngineRunner, MatrixSummary, run_matrix};

use crate::config::Config;

/// Options of the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project directory to build
    #[arg(long, env = "VMATRIX_PROJECT", default_value = ".")]
    pub project: PathBuf,

    /// Build descriptor file name inside the project
    #[arg(long, env = "VMATRIX_DESCRIPTOR", default_value = "Dockerfile")]
    pub descriptor: String,

    /// Image pinned by every synthesized descriptor
    #[arg(long, env = "VMATRIX_BASE_IMAGE", default_value = "nodesource/node")]
    pub base_image: String,

    /// Build engine executable
    #[arg(long, env = "VMATRIX_ENGINE", default_value = "docker")]
    pub engine: String,

    /// Prefix of the built image tags
    #[arg(long, env = "VMATRIX_IMAGE_PREFIX", default_value = "project")]
    pub image_prefix: String,

    /// Directory for per-version workspaces (defaults to the system temp dir)
    #[arg(long, env = "VMATRIX_WORKSPACE_DIR")]
    pub workspace_dir: Option<PathBuf>,

    /// Report location
    #[arg(long, env = "VMATRIX_REPORT", default_value = "output.md")]
    pub report: PathBuf,

    /// Max builds at once (0 = all versions at once)
    #[arg(short = 'j', long, env = "VMATRIX_MAX_PARALLEL_JOBS", default_value_t = 0)]
    pub jobs: usize,

    /// Per-build time limit in seconds
    #[arg(long, env = "VMATRIX_JOB_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Leave the workspaces on disk after the run
    #[arg(long)]
    pub keep_workspaces: bool,

    /// Exit with an error when any version fails to build
    #[arg(long)]
    pub fail_on_error: bool,

    /// Build only these versions instead of fetching the catalog
    #[arg(long, value_name = "VERSION")]
    pub only: Vec<String>,
}

impl BuildArgs {
    /// Runner configuration for these options
    fn runner_config(&self) -> vmatrix_runner::Config {
        let mut config = vmatrix_runner::Config::new(&self.project)
            .with_report_path(&self.report)
            .with_max_parallel_jobs(self.jobs)
            .with_job_timeout(self.timeout.map(Duration::from_secs));

        config.descriptor_name = self.descriptor.clone();
        config.base_image = self.base_image.clone();
        config.engine = self.engine.clone();
        config.image_prefix = self.image_prefix.clone();
        config.keep_workspaces = self.keep_workspaces;
        if let Some(dir) = &self.workspace_dir {
            config = config.with_workspace_base(dir);
        }

        config
    }
}

/// Run the matrix build
pub async fn handle_build_command(args: BuildArgs, config: &Config) -> Result<()> {
    let runner_config = args.runner_config();
    runner_config.validate().context("Invalid build options")?;

    let versions = resolve_versions(&args, config).await?;

    if let Err(e) = check_engine_available(&runner_config.engine).await {
        warn!(
            "Build engine '{}' is not available ({}); builds will fail to start",
            runner_config.engine, e
        );
    }

    println!("Building against {} version(s)...", versions.len());

    let summary = run_matrix(&runner_config, &versions, Arc::new(EngineRunner::new()))
        .await
        .context("Matrix build failed")?;

    print_summary(&summary);

    if args.fail_on_error && !summary.all_passed() {
        anyhow::bail!("{} version(s) failed to build", summary.failed.len());
    }

    Ok(())
}

/// Versions given with `--only`, or the catalog's release versions
async fn resolve_versions(args: &BuildArgs, config: &Config) -> Result<Vec<VersionId>> {
    if !args.only.is_empty() {
        return args
            .only
            .iter()
            .map(|v| VersionId::parse(v.as_str()).with_context(|| format!("Invalid version '{}'", v)))
            .collect();
    }

    println!("Fetching available versions");
    CatalogClient::new(&config.registry_url)
        .fetch_versions()
        .await
        .context("Failed to fetch the version catalog")
}

/// Print the outcome of a run
fn print_summary(summary: &MatrixSummary) {
    println!();

    if summary.total == 0 {
        println!("{}", "No versions to build.".yellow());
    } else if summary.all_passed() {
        println!("{}", "All builds passed! Congratz!".green().bold());
    } else {
        println!(
            "{}",
            "The following versions did not build properly:".red().bold()
        );
        for version in &summary.failed {
            println!("\t{}", version.to_string().red());
        }
    }

    for version in &summary.report.degraded {
        println!(
            "{}",
            format!("Output for {} could not be read", version).yellow()
        );
    }
    for version in &summary.report.skipped {
        println!(
            "{}",
            format!("Output for {} is missing from the report", version).yellow()
        );
    }

    for path in &summary.kept_workspaces {
        println!("Kept workspace {}", path.display().to_string().dimmed());
    }

    println!(
        "Check the generated {} for more information",
        summary.report.path.display().to_string().bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: BuildArgs,
    }

    #[test]
    fn test_defaults_map_to_runner_config() {
        let harness = Harness::try_parse_from(["build"]).unwrap();
        let config = harness.args.runner_config();

        assert_eq!(config.descriptor_name, "Dockerfile");
        assert_eq!(config.engine, "docker");
        assert_eq!(config.max_parallel_jobs, 0);
        assert!(config.job_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_map_to_runner_config() {
        let harness = Harness::try_parse_from([
            "build",
            "--engine",
            "podman",
            "--descriptor",
            "Containerfile",
            "--workspace-dir",
            "/var/tmp/vmatrix",
            "--timeout",
            "90",
            "--keep-workspaces",
        ])
        .unwrap();
        let config = harness.args.runner_config();

        assert_eq!(config.engine, "podman");
        assert_eq!(config.descriptor_name, "Containerfile");
        assert_eq!(config.workspace_base, PathBuf::from("/var/tmp/vmatrix"));
        assert_eq!(config.job_timeout, Some(Duration::from_secs(90)));
        assert!(config.keep_workspaces);
    }

    #[tokio::test]
    async fn test_explicit_versions_skip_catalog() {
        let harness =
            Harness::try_parse_from(["build", "--only", "4.5.6", "--only", "iojs-1.2.0"]).unwrap();
        let config = Config {
            registry_url: "http://127.0.0.1:1/unused".to_string(),
        };

        let versions = resolve_versions(&harness.args, &config).await.unwrap();
        let names: Vec<&str> = versions.iter().map(VersionId::as_str).collect();
        assert_eq!(names, vec!["4.5.6", "iojs-1.2.0"]);
    }

    #[tokio::test]
    async fn test_invalid_explicit_version() {
        let harness = Harness::try_parse_from(["build", "--only", "../etc"]).unwrap();
        let config = Config {
            registry_url: "http://127.0.0.1:1/unused".to_string(),
        };

        assert!(resolve_versions(&harness.args, &config).await.is_err());
    }
}
