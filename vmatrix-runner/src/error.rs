//! Error types for the runner
//!
//! Every error here is fatal for the run it occurs in. Failures of individual
//! builds or report sections are recorded in the results instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use vmatrix_core::domain::version::VersionId;

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure to load the build descriptor template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(
        "no build descriptor found at {}. Please create a build descriptor that builds your project",
        path.display()
    )]
    DescriptorMissing { path: PathBuf },

    #[error("failed to read build descriptor {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to materialize a workspace; aborts the whole run
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to allocate workspace for {version}: {source}")]
    Allocation {
        version: VersionId,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy project tree for {version}: {source}")]
    TreeCopy {
        version: VersionId,
        #[source]
        source: io::Error,
    },

    #[error("failed to write build descriptor for {version}: {source}")]
    DescriptorWrite {
        version: VersionId,
        #[source]
        source: io::Error,
    },

    #[error("workspace task for {version} did not complete: {message}")]
    Interrupted { version: VersionId, message: String },
}

impl WorkspaceError {
    /// The version whose materialization failed
    pub fn version(&self) -> &VersionId {
        match self {
            Self::Allocation { version, .. }
            | Self::TreeCopy { version, .. }
            | Self::DescriptorWrite { version, .. }
            | Self::Interrupted { version, .. } => version,
        }
    }
}

/// Failure to create the report document
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create report {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Any fatal error of a matrix run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_error_carries_version() {
        let version = VersionId::parse("4.5.6").unwrap();
        let err = WorkspaceError::TreeCopy {
            version: version.clone(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.version(), &version);
        assert_eq!(
            err.to_string(),
            "failed to copy project tree for 4.5.6: denied"
        );
    }

    #[test]
    fn test_descriptor_missing_guidance() {
        let err = TemplateError::DescriptorMissing {
            path: PathBuf::from("/app/Dockerfile"),
        };
        let message = PipelineError::from(err).to_string();
        assert!(message.contains("/app/Dockerfile"));
        assert!(message.contains("create a build descriptor that builds your project"));
    }
}
