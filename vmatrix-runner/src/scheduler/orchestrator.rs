//! Build orchestrator
//!
//! Runs one engine build per workspace. Each build runs in its own task with
//! a capture file inside its workspace. Builds never cancel each other: a
//! failure is recorded against its version and every other build continues.

use chrono::Utc;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use vmatrix_core::domain::job::{BuildJob, JobStatus};
use vmatrix_core::domain::version::VersionId;

use crate::config::Config;
use crate::engine::{BuildCommand, CaptureSink, ProcessRunner};
use crate::workspace::Workspace;

/// A version's workspace together with its finished build
#[derive(Debug)]
pub struct MatrixEntry {
    pub workspace: Workspace,
    pub job: BuildJob,
}

/// Outcome of a whole matrix run, in catalog order
#[derive(Debug, Default)]
pub struct BuildMatrixResult {
    entries: IndexMap<VersionId, MatrixEntry>,
}

impl BuildMatrixResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, version: &VersionId) -> Option<&MatrixEntry> {
        self.entries.get(version)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VersionId, &MatrixEntry)> {
        self.entries.iter()
    }

    /// Versions whose build did not pass, in catalog order
    pub fn failed(&self) -> Vec<VersionId> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.job.is_success())
            .map(|(version, _)| version.clone())
            .collect()
    }

    /// Consumes the result, handing back the workspaces
    pub fn into_workspaces(self) -> impl Iterator<Item = Workspace> {
        self.entries.into_values().map(|entry| entry.workspace)
    }
}

/// Runs the engine for every workspace on a bounded pool
pub struct BuildOrchestrator {
    config: Config,
    runner: Arc<dyn ProcessRunner>,
}

impl BuildOrchestrator {
    pub fn new(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config: config.clone(),
            runner,
        }
    }

    /// Builds every workspace and waits until all builds are terminal
    ///
    /// # Returns
    /// One entry per workspace, in the order given
    pub async fn run(&self, workspaces: IndexMap<VersionId, Workspace>) -> BuildMatrixResult {
        if workspaces.is_empty() {
            return BuildMatrixResult::default();
        }

        let limit = self.config.worker_limit(workspaces.len());
        info!(
            "Building against {} version(s), up to {} at a time",
            workspaces.len(),
            limit
        );

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut handles = Vec::with_capacity(workspaces.len());

        for (version, workspace) in &workspaces {
            let command =
                BuildCommand::for_version(&self.config, version, workspace.root().to_path_buf());
            let capture_path = workspace.capture_path().to_path_buf();
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.config.job_timeout;
            let task_version = version.clone();

            let handle = tokio::spawn(async move {
                // Permit is released when the task ends
                let _permit = semaphore.acquire_owned().await;
                Self::execute_build(task_version, command, &capture_path, runner, timeout).await
            });
            handles.push((version.clone(), handle));
        }

        let mut jobs = IndexMap::with_capacity(handles.len());
        for (version, handle) in handles {
            let job = match handle.await {
                Ok(job) => job,
                Err(e) => {
                    error!(version = %version, "Build task panicked: {}", e);
                    BuildJob::new(
                        version.clone(),
                        JobStatus::SpawnFailed {
                            message: format!("build task failed: {}", e),
                        },
                        Utc::now(),
                    )
                }
            };
            jobs.insert(version, job);
        }

        let entries = workspaces
            .into_iter()
            .filter_map(|(version, workspace)| {
                jobs.swap_remove(&version)
                    .map(|job| (version, MatrixEntry { workspace, job }))
            })
            .collect();
        let result = BuildMatrixResult { entries };

        info!(
            "All builds finished: {} passed, {} failed",
            result.len() - result.failed().len(),
            result.failed().len()
        );
        result
    }

    /// Runs a single build and classifies its outcome
    async fn execute_build(
        version: VersionId,
        command: BuildCommand,
        capture_path: &Path,
        runner: Arc<dyn ProcessRunner>,
        timeout: Option<Duration>,
    ) -> BuildJob {
        let started_at = Utc::now();
        let sink = open_capture(&version, capture_path).await;

        debug!(version = %version, "Running `{}`", command);

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, runner.run(&command, sink)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(version = %version, "Build timed out after {:?}", limit);
                    return BuildJob::new(
                        version,
                        JobStatus::TimedOut {
                            after_secs: limit.as_secs(),
                        },
                        started_at,
                    );
                }
            },
            None => runner.run(&command, sink).await,
        };

        let status = match outcome {
            Ok(exit_code) => JobStatus::from_exit_code(exit_code),
            Err(e) => {
                error!(version = %version, "Failed to start `{}`: {}", command.program, e);
                JobStatus::SpawnFailed {
                    message: e.to_string(),
                }
            }
        };

        info!(version = %version, "Finished building {}: {}", version, status);
        BuildJob::new(version, status, started_at)
    }
}

/// Opens the capture file, falling back to discarding output
async fn open_capture(version: &VersionId, path: &Path) -> CaptureSink {
    match tokio::fs::File::create(path).await {
        Ok(file) => CaptureSink::capture(file.into_std().await),
        Err(e) => {
            warn!(
                version = %version,
                "Cannot open capture file {}, output will be discarded: {}",
                path.display(),
                e
            );
            CaptureSink::Discard
        }
    }
}
