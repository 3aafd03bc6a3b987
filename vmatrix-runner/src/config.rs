//! Runner configuration
//!
//! Defines all configurable parameters for a matrix build including
//! project and workspace locations, build engine settings, and the
//! worker-pool limits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Runner configuration
///
/// Defaults reproduce a plain `docker build` of a Node project against the
/// nodesource images, with every version built at once.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project tree copied into every workspace (never modified)
    pub project_root: PathBuf,

    /// Build descriptor file name at the project root
    pub descriptor_name: String,

    /// Image the synthesized descriptors pin, e.g. `nodesource/node`
    pub base_image: String,

    /// Build engine executable
    pub engine: String,

    /// Prefix of the built image tags (`<prefix>-<version>`)
    pub image_prefix: String,

    /// Directory under which workspaces are allocated
    pub workspace_base: PathBuf,

    /// Name of the capture file written inside each workspace
    pub capture_file_name: String,

    /// Consolidated report location
    pub report_path: PathBuf,

    /// Title at the top of the report
    pub report_title: String,

    /// Max concurrent materializations and builds; 0 means one per version
    pub max_parallel_jobs: usize,

    /// Maximum time a single build can run before it is killed
    pub job_timeout: Option<Duration>,

    /// Leave workspaces on disk after the run
    pub keep_workspaces: bool,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            descriptor_name: "Dockerfile".to_string(),
            base_image: "nodesource/node".to_string(),
            engine: "docker".to_string(),
            image_prefix: "project".to_string(),
            workspace_base: std::env::temp_dir(),
            capture_file_name: "output".to_string(),
            report_path: PathBuf::from("output.md"),
            report_title: "vmatrix output".to_string(),
            max_parallel_jobs: 0,
            job_timeout: None,
            keep_workspaces: false,
        }
    }

    pub fn with_workspace_base(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_base = dir.into();
        self
    }

    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    pub fn with_max_parallel_jobs(mut self, jobs: usize) -> Self {
        self.max_parallel_jobs = jobs;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Number of pool permits for a run over `versions` versions
    pub fn worker_limit(&self, versions: usize) -> usize {
        match self.max_parallel_jobs {
            0 => versions.max(1),
            n => n,
        }
    }

    /// Path of the build descriptor in the source project
    pub fn descriptor_path(&self) -> PathBuf {
        self.project_root.join(&self.descriptor_name)
    }

    /// Whether workspaces would be allocated directly in the project root
    ///
    /// Such workspaces would be copied into each other.
    pub fn workspace_base_is_project_root(&self) -> bool {
        same_directory(&self.project_root, &self.workspace_base)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("engine", &self.engine)?;
        require_non_empty("base_image", &self.base_image)?;
        require_non_empty("image_prefix", &self.image_prefix)?;
        require_file_name("descriptor_name", &self.descriptor_name)?;
        require_file_name("capture_file_name", &self.capture_file_name)?;

        if self.descriptor_name == self.capture_file_name {
            return Err(ConfigError::Invalid {
                field: "capture_file_name",
                reason: "must differ from descriptor_name".to_string(),
            });
        }

        if self.image_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "image_prefix",
                reason: "must not contain whitespace".to_string(),
            });
        }

        if self.workspace_base_is_project_root() {
            return Err(ConfigError::Invalid {
                field: "workspace_base",
                reason: "must not be the project root".to_string(),
            });
        }

        if matches!(self.job_timeout, Some(t) if t.is_zero()) {
            return Err(ConfigError::Invalid {
                field: "job_timeout",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Compares canonical paths, falling back to the paths as written
pub(crate) fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Accepts a single normal path component such as `Dockerfile`
fn require_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    require_non_empty(field, value)?;

    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(()),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("'{}' must be a plain file name", value),
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(".")
    }
}
