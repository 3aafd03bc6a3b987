//! Consolidated report
//!
//! Writes one Markdown document with a section per version. Sections are
//! appended one at a time in catalog order. Only creating the document is
//! fatal; a version whose capture cannot be read or appended is logged and
//! the report carries on with the next version.

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};
use vmatrix_core::domain::version::VersionId;

use crate::error::ReportError;
use crate::scheduler::{BuildMatrixResult, MatrixEntry};

/// What happened while writing the report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Document location
    pub path: PathBuf,
    /// Sections appended successfully
    pub written: usize,
    /// Versions whose capture could not be read; their section holds a placeholder
    pub degraded: Vec<VersionId>,
    /// Versions whose section could not be appended
    pub skipped: Vec<VersionId>,
}

/// Writes the consolidated report
pub struct ReportGenerator {
    path: PathBuf,
    title: String,
}

impl ReportGenerator {
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates (or overwrites) the report and appends every version's section
    pub async fn generate(&self, result: &BuildMatrixResult) -> Result<ReportSummary, ReportError> {
        info!("Generating report at {}", self.path.display());

        tokio::fs::write(&self.path, render_header(&self.title))
            .await
            .map_err(|source| ReportError::Create {
                path: self.path.clone(),
                source,
            })?;

        let mut summary = ReportSummary {
            path: self.path.clone(),
            ..ReportSummary::default()
        };

        for (version, entry) in result.iter() {
            let captured = match tokio::fs::read(entry.workspace.capture_path()).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    error!(version = %version, "Error while reading build output: {}", e);
                    summary.degraded.push(version.clone());
                    format!("capture unavailable: {}", e)
                }
            };

            let section = render_section(version, entry, &captured);
            match self.append(&section).await {
                Ok(()) => {
                    debug!(version = %version, "Appended report section");
                    summary.written += 1;
                }
                Err(e) => {
                    error!(version = %version, "Error while appending report section: {}", e);
                    summary.skipped.push(version.clone());
                }
            }
        }

        info!(
            "Report written: {} section(s), {} degraded, {} skipped",
            summary.written,
            summary.degraded.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    async fn append(&self, section: &str) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(section.as_bytes()).await?;
        file.flush().await
    }
}

fn render_header(title: &str) -> String {
    format!("{}\n{}\n\n", title, "=".repeat(title.chars().count()))
}

fn render_section(version: &VersionId, entry: &MatrixEntry, captured: &str) -> String {
    let fence = fence_for(captured);
    format!(
        "## {}\n\n**Result:** {}\n\n{}\n{}\n{}\n\n",
        version, entry.job.status, fence, captured, fence
    )
}

/// A backtick fence longer than any backtick run inside `text`
fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in text.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
