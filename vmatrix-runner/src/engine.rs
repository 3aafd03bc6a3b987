//! Build engine process management
//!
//! Handles running the container build engine:
//! - Checking the engine is available
//! - Building the per-version engine invocation
//! - Running it with stdout and stderr redirected to one capture sink
//!
//! The scheduler only talks to the [`ProcessRunner`] trait, so tests can
//! swap the real engine for a scripted one.

use async_trait::async_trait;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};
use vmatrix_core::domain::version::VersionId;

use crate::config::Config;

/// One engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, also the build context
    pub cwd: PathBuf,
}

impl BuildCommand {
    /// `<engine> build --no-cache -f <descriptor> -t <prefix>-<version> .`
    pub fn for_version(config: &Config, version: &VersionId, cwd: PathBuf) -> Self {
        Self {
            program: config.engine.clone(),
            args: vec![
                "build".to_string(),
                "--no-cache".to_string(),
                "-f".to_string(),
                config.descriptor_name.clone(),
                "-t".to_string(),
                version.image_tag(&config.image_prefix),
                ".".to_string(),
            ],
            cwd,
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Destination of a process's combined output
#[derive(Debug)]
pub enum CaptureSink {
    /// Both streams go to one capture file through two handles
    File { stdout: File, stderr: File },
    /// Output is thrown away
    Discard,
}

impl CaptureSink {
    /// Sends both output streams to `file`
    ///
    /// Falls back to [`CaptureSink::Discard`] when the handle cannot be
    /// duplicated, so the build still runs.
    pub fn capture(file: File) -> Self {
        Self::from_handles(file.try_clone().map(|stderr| (file, stderr)))
    }

    fn from_handles(handles: io::Result<(File, File)>) -> Self {
        match handles {
            Ok((stdout, stderr)) => Self::File { stdout, stderr },
            Err(e) => {
                warn!("Cannot duplicate capture file handle, output will be discarded: {}", e);
                Self::Discard
            }
        }
    }

    fn into_stdio(self) -> (Stdio, Stdio) {
        match self {
            Self::File { stdout, stderr } => (Stdio::from(stdout), Stdio::from(stderr)),
            Self::Discard => (Stdio::null(), Stdio::null()),
        }
    }
}

/// Runs a command to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` with both output streams sent to `sink`
    ///
    /// Dropping the returned future must stop the process.
    ///
    /// # Returns
    /// The exit code, or `None` when the process was killed by a signal.
    /// An error means the process could not be started.
    async fn run(&self, command: &BuildCommand, sink: CaptureSink) -> io::Result<Option<i32>>;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct EngineRunner;

impl EngineRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for EngineRunner {
    async fn run(&self, command: &BuildCommand, sink: CaptureSink) -> io::Result<Option<i32>> {
        let (stdout, stderr) = sink.into_stdio();

        debug!("Spawning `{}` in {}", command, command.cwd.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()?;

        let status = child.wait().await?;
        Ok(status.code())
    }
}

/// Checks that the build engine can be executed
///
/// # Returns
/// The engine's version string
pub async fn check_engine_available(program: &str) -> io::Result<String> {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("`{} --version` failed: {}", program, stderr.trim());
        return Err(io::Error::other(format!(
            "{} is not working correctly",
            program
        )));
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    info!("Build engine is available: {}", version);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_for_version() {
        let config = Config::default();
        let version = VersionId::parse("4.5.6").unwrap();
        let command = BuildCommand::for_version(&config, &version, PathBuf::from("/tmp/ws"));

        assert_eq!(command.program, "docker");
        assert_eq!(command.cwd, PathBuf::from("/tmp/ws"));
        assert_eq!(
            command.to_string(),
            "docker build --no-cache -f Dockerfile -t project-4.5.6 ."
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_runner_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("output");
        let command = BuildCommand {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo to-stdout; echo to-stderr >&2; exit 3".to_string(),
            ],
            cwd: dir.path().to_path_buf(),
        };

        let file = File::create(&capture).unwrap();
        let code = EngineRunner::new()
            .run(&command, CaptureSink::capture(file))
            .await
            .unwrap();

        assert_eq!(code, Some(3));
        let output = std::fs::read_to_string(&capture).unwrap();
        assert!(output.contains("to-stdout"));
        assert!(output.contains("to-stderr"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_runner_uses_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let command = BuildCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "test -f marker".to_string()],
            cwd: dir.path().to_path_buf(),
        };

        let code = EngineRunner::new()
            .run(&command, CaptureSink::Discard)
            .await
            .unwrap();
        assert_eq!(code, Some(0));
    }

    #[tokio::test]
    async fn test_engine_runner_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let command = BuildCommand {
            program: "vmatrix-no-such-engine".to_string(),
            args: vec![],
            cwd: dir.path().to_path_buf(),
        };

        let err = EngineRunner::new()
            .run(&command, CaptureSink::Discard)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_capture_falls_back_to_discard() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("output")).unwrap();
        assert!(matches!(CaptureSink::capture(file), CaptureSink::File { .. }));

        let sink = CaptureSink::from_handles(Err(io::Error::other("too many open files")));
        assert!(matches!(sink, CaptureSink::Discard));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_discarded_capture_still_runs_build() {
        let dir = tempfile::tempdir().unwrap();
        let command = BuildCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo lost; exit 4".to_string()],
            cwd: dir.path().to_path_buf(),
        };

        let sink = CaptureSink::from_handles(Err(io::Error::other("too many open files")));
        let code = EngineRunner::new().run(&command, sink).await.unwrap();
        assert_eq!(code, Some(4));
    }

    #[tokio::test]
    async fn test_check_engine_missing() {
        assert!(check_engine_available("vmatrix-no-such-engine").await.is_err());
    }
}
