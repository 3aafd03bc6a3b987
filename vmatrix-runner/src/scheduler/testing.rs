//! Test doubles for the build engine

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use vmatrix_core::domain::version::VersionId;

use crate::config::Config;
use crate::engine::{BuildCommand, CaptureSink, ProcessRunner};
use crate::template::BuildTemplate;
use crate::workspace::{Workspace, WorkspaceFactory};

/// Canned behaviour for one version
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub output: String,
    pub exit_code: Option<i32>,
    pub delay: Duration,
    pub spawn_error: bool,
}

impl Script {
    pub fn exit(code: i32, output: &str) -> Self {
        Self {
            output: output.to_string(),
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn spawn_error() -> Self {
        Self {
            spawn_error: true,
            ..Self::default()
        }
    }
}

/// Fake engine: writes scripted output and returns scripted exit codes
///
/// Versions are recognised by the `project-<version>` image tag. Unscripted
/// versions pass with no output.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<BuildCommand>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, version: &str, script: Script) -> Self {
        self.scripts.insert(version.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<BuildCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of builds that were running at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn version_of(command: &BuildCommand) -> String {
        let tag_index = command.args.iter().position(|a| a == "-t").unwrap() + 1;
        command.args[tag_index]
            .strip_prefix("project-")
            .unwrap()
            .to_string()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, command: &BuildCommand, sink: CaptureSink) -> io::Result<Option<i32>> {
        self.calls.lock().unwrap().push(command.clone());
        let script = self
            .scripts
            .get(&Self::version_of(command))
            .cloned()
            .unwrap_or_else(|| Script::exit(0, ""));

        if script.spawn_error {
            return Err(io::Error::new(io::ErrorKind::NotFound, "engine not found"));
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(script.delay).await;
        if let CaptureSink::File { stdout: mut file, .. } = sink {
            file.write_all(script.output.as_bytes())?;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(script.exit_code)
    }
}

pub fn versions(names: &[&str]) -> Vec<VersionId> {
    names.iter().map(|n| VersionId::parse(*n).unwrap()).collect()
}

/// A small project tree with a descriptor
pub fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    dir
}

pub fn write_project(path: &Path) {
    std::fs::write(path.join("Dockerfile"), "FROM node:0.10\nCOPY . /app\nRUN npm test\n").unwrap();
    std::fs::write(path.join("package.json"), "{\"name\": \"app\"}").unwrap();
}

pub async fn materialize(config: &Config, names: &[&str]) -> IndexMap<VersionId, Workspace> {
    let template = BuildTemplate::load(&config.project_root, &config.descriptor_name).unwrap();
    WorkspaceFactory::new(config)
        .materialize(&versions(names), &template)
        .await
        .unwrap()
}
