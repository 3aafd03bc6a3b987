//! Build job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::version::VersionId;

/// Terminal state of one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Engine exited with status 0
    Passed,
    /// Engine exited non-zero, or was killed by a signal (`exit_code == None`)
    Failed { exit_code: Option<i32> },
    /// The engine process could not be started at all
    SpawnFailed { message: String },
    /// The job exceeded its time limit and was killed
    TimedOut { after_secs: u64 },
}

impl JobStatus {
    /// Classifies a process exit code
    pub fn from_exit_code(exit_code: Option<i32>) -> Self {
        match exit_code {
            Some(0) => Self::Passed,
            other => Self::Failed { exit_code: other },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed {
                exit_code: Some(code),
            } => write!(f, "failed (exit code {})", code),
            Self::Failed { exit_code: None } => write!(f, "failed (terminated by signal)"),
            Self::SpawnFailed { message } => write!(f, "failed to start: {}", message),
            Self::TimedOut { after_secs } => write!(f, "timed out after {}s", after_secs),
        }
    }
}

/// Record of one completed build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildJob {
    pub version: VersionId,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildJob {
    pub fn new(version: VersionId, status: JobStatus, started_at: DateTime<Utc>) -> Self {
        Self {
            version,
            status,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Wall-clock duration of the build
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
