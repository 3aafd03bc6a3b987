//! Matrix build pipeline
//!
//! Template → workspaces → builds → report. Each stage finishes for every
//! version before the next one starts, so a setup failure can never show up
//! as a build failure.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use vmatrix_core::domain::version::VersionId;

use crate::config::Config;
use crate::engine::ProcessRunner;
use crate::error::PipelineError;
use crate::report::{ReportGenerator, ReportSummary};
use crate::scheduler::BuildOrchestrator;
use crate::template::BuildTemplate;
use crate::workspace::WorkspaceFactory;

/// Result of a complete matrix run
#[derive(Debug, Clone)]
pub struct MatrixSummary {
    /// Number of versions built
    pub total: usize,
    /// Versions that did not pass, in catalog order
    pub failed: Vec<VersionId>,
    pub report: ReportSummary,
    /// Workspaces left on disk when `keep_workspaces` is set
    pub kept_workspaces: Vec<PathBuf>,
}

impl MatrixSummary {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the full matrix build for `versions`
///
/// Fails only on setup errors (config, descriptor, workspaces) or when the
/// report cannot be created. Individual build failures are listed in the
/// returned summary.
pub async fn run_matrix(
    config: &Config,
    versions: &[VersionId],
    runner: Arc<dyn ProcessRunner>,
) -> Result<MatrixSummary, PipelineError> {
    config.validate()?;

    let template = BuildTemplate::load(&config.project_root, &config.descriptor_name)?;

    info!("Creating temporary working directories");
    let workspaces = WorkspaceFactory::new(config)
        .materialize(versions, &template)
        .await?;

    let result = BuildOrchestrator::new(config, runner)
        .run(workspaces)
        .await;

    let report = ReportGenerator::new(&config.report_path, &config.report_title)
        .generate(&result)
        .await;

    let total = result.len();
    let failed = result.failed();

    // Kept workspaces survive a failed report
    let kept_workspaces = if config.keep_workspaces {
        result
            .into_workspaces()
            .map(|workspace| {
                let version = workspace.version().clone();
                let path = workspace.persist();
                info!(version = %version, "Keeping workspace at {}", path.display());
                path
            })
            .collect()
    } else {
        // Dropping the result removes every workspace
        Vec::new()
    };

    let report = report?;

    Ok(MatrixSummary {
        total,
        failed,
        report,
        kept_workspaces,
    })
}
