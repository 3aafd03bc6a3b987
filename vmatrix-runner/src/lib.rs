//! vmatrix Runner
//!
//! Builds one project against a matrix of runtime versions.
//!
//! Architecture:
//! - Configuration: paths, engine settings and worker-pool limits
//! - Template: the project's build descriptor without its base-image pin
//! - Workspace: one disposable copy of the project per version
//! - Engine: the process seam used to run the container build engine
//! - Scheduler: fans builds out over a bounded pool and waits for all of them
//! - Report: one Markdown document with every version's captured output
//!
//! [`pipeline::run_matrix`] wires the stages together. Each stage only starts
//! once the previous one has finished for every version.

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod template;
pub mod workspace;

pub use config::Config;
pub use engine::{BuildCommand, CaptureSink, EngineRunner, ProcessRunner};
pub use error::{ConfigError, PipelineError, ReportError, TemplateError, WorkspaceError};
pub use pipeline::{MatrixSummary, run_matrix};
pub use report::{ReportGenerator, ReportSummary};
pub use scheduler::{BuildMatrixResult, BuildOrchestrator};
pub use template::BuildTemplate;
pub use workspace::{Workspace, WorkspaceFactory};
