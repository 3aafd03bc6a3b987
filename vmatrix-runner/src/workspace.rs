//! Per-version workspaces
//!
//! Handles workspace lifecycle for a matrix run:
//! - Allocating a unique temporary directory per version
//! - Deep-copying the project tree into it
//! - Writing the version's synthesized build descriptor
//! - Removing the directory when the workspace is dropped (unless persisted)

use indexmap::IndexMap;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vmatrix_core::domain::version::VersionId;

use crate::config::{Config, same_directory};
use crate::error::WorkspaceError;
use crate::template::BuildTemplate;

/// One isolated build attempt for one version
///
/// Owns its directory exclusively. Dropping the workspace removes the
/// directory; [`Workspace::persist`] leaves it on disk instead.
#[derive(Debug)]
pub struct Workspace {
    version: VersionId,
    root: PathBuf,
    descriptor_path: PathBuf,
    capture_path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn version(&self) -> &VersionId {
        &self.version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Synthesized descriptor at the workspace root
    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    /// Where the build's combined output is captured
    pub fn capture_path(&self) -> &Path {
        &self.capture_path
    }

    /// Keeps the directory on disk and returns its path
    pub fn persist(mut self) -> PathBuf {
        match self.dir.take() {
            Some(dir) => dir.keep(),
            None => self.root.clone(),
        }
    }
}

/// Creates the workspaces of a matrix run
pub struct WorkspaceFactory {
    project_root: PathBuf,
    workspace_base: PathBuf,
    descriptor_name: String,
    capture_file_name: String,
    base_image: String,
    max_parallel_jobs: usize,
}

impl WorkspaceFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            project_root: config.project_root.clone(),
            workspace_base: config.workspace_base.clone(),
            descriptor_name: config.descriptor_name.clone(),
            capture_file_name: config.capture_file_name.clone(),
            base_image: config.base_image.clone(),
            max_parallel_jobs: config.max_parallel_jobs,
        }
    }

    /// Materializes one workspace per distinct version
    ///
    /// Versions are processed concurrently on a bounded pool. The first
    /// failure aborts the remaining work and every workspace created so far
    /// is removed, so the caller either gets the full matrix or an error.
    ///
    /// # Returns
    /// Workspaces keyed by version, in input order
    pub async fn materialize(
        &self,
        versions: &[VersionId],
        template: &BuildTemplate,
    ) -> Result<IndexMap<VersionId, Workspace>, WorkspaceError> {
        let mut seen = HashSet::new();
        let versions: Vec<VersionId> = versions
            .iter()
            .filter(|v| {
                let fresh = seen.insert((*v).clone());
                if !fresh {
                    warn!(version = %v, "Duplicate version ignored");
                }
                fresh
            })
            .cloned()
            .collect();

        if versions.is_empty() {
            return Ok(IndexMap::new());
        }

        info!("Creating {} workspace(s)", versions.len());

        tokio::fs::create_dir_all(&self.workspace_base)
            .await
            .map_err(|source| WorkspaceError::Allocation {
                version: versions[0].clone(),
                source,
            })?;

        if same_directory(&self.project_root, &self.workspace_base) {
            return Err(WorkspaceError::Allocation {
                version: versions[0].clone(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "workspace base is the project root",
                ),
            });
        }

        let limit = match self.max_parallel_jobs {
            0 => versions.len(),
            n => n,
        };
        let semaphore = Arc::new(Semaphore::new(limit));
        let skip = self.nested_workspace_base();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for version in &versions {
            let job = MaterializeJob {
                version: version.clone(),
                project_root: self.project_root.clone(),
                workspace_base: self.workspace_base.clone(),
                descriptor_name: self.descriptor_name.clone(),
                capture_file_name: self.capture_file_name.clone(),
                descriptor: template.render(&self.base_image, version),
                skip: skip.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let version = job.version.clone();
                let result = job.run().await;
                let _ = tx.send((version, result));
            });
        }
        drop(tx);

        let mut created: IndexMap<VersionId, Workspace> = IndexMap::new();
        while let Some((version, result)) = rx.recv().await {
            match result {
                Ok(workspace) => {
                    debug!(version = %version, "Workspace ready at {}", workspace.root.display());
                    created.insert(version, workspace);
                }
                Err(e) => {
                    // Dropping the set aborts the rest; dropping `created` removes finished ones
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        // A task that ended without reporting panicked or was cancelled
        if let Some(version) = versions.iter().find(|v| !created.contains_key(*v)) {
            return Err(WorkspaceError::Interrupted {
                version: version.clone(),
                message: "task ended without a result".to_string(),
            });
        }

        let ordered = versions
            .iter()
            .filter_map(|v| created.swap_remove(v).map(|w| (v.clone(), w)))
            .collect();

        info!("All {} workspace(s) ready", versions.len());
        Ok(ordered)
    }

    /// The workspace base, when it lies inside the project tree
    fn nested_workspace_base(&self) -> Option<PathBuf> {
        let project = self.project_root.canonicalize().ok()?;
        let base = self.workspace_base.canonicalize().ok()?;
        base.starts_with(&project).then_some(base)
    }
}

/// Everything one materialization task needs, owned
struct MaterializeJob {
    version: VersionId,
    project_root: PathBuf,
    workspace_base: PathBuf,
    descriptor_name: String,
    capture_file_name: String,
    descriptor: String,
    skip: Option<PathBuf>,
}

impl MaterializeJob {
    async fn run(self) -> Result<Workspace, WorkspaceError> {
        let dir = self.allocate().map_err(|source| WorkspaceError::Allocation {
            version: self.version.clone(),
            source,
        })?;
        let root = dir.path().to_path_buf();

        let copied = copy_tree(&self.project_root, &root, self.skip.as_deref())
            .await
            .map_err(|source| WorkspaceError::TreeCopy {
                version: self.version.clone(),
                source,
            })?;
        debug!(version = %self.version, "Copied {} file(s)", copied);

        let descriptor_path = root.join(&self.descriptor_name);
        tokio::fs::write(&descriptor_path, &self.descriptor)
            .await
            .map_err(|source| WorkspaceError::DescriptorWrite {
                version: self.version.clone(),
                source,
            })?;

        Ok(Workspace {
            capture_path: root.join(&self.capture_file_name),
            descriptor_path,
            root,
            version: self.version,
            dir: Some(dir),
        })
    }

    fn allocate(&self) -> io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix(&format!("vmatrix-{}-", self.version))
            .tempdir_in(&self.workspace_base)
    }
}

/// Recursively copies `src` into the existing directory `dst`
///
/// Symlinks are recreated as links on Unix. `skip` is left out of the copy.
///
/// # Returns
/// Number of files and links copied
pub async fn copy_tree(src: &Path, dst: &Path, skip: Option<&Path>) -> io::Result<u64> {
    let src = src.canonicalize()?;
    let mut copied = 0;
    let mut pending = vec![(src, dst.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&from_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let from = entry.path();
            if skip.is_some_and(|s| s == from) {
                continue;
            }

            let to = to_dir.join(entry.file_name());
            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                tokio::fs::create_dir(&to).await?;
                pending.push((from, to));
            } else if file_type.is_symlink() {
                copy_symlink(&from, &to).await?;
                copied += 1;
            } else {
                tokio::fs::copy(&from, &to).await?;
                copied += 1;
            }
        }
    }

    Ok(copied)
}

#[cfg(unix)]
async fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = tokio::fs::read_link(from).await?;
    tokio::fs::symlink(target, to).await
}

#[cfg(not(unix))]
async fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    tokio::fs::copy(from, to).await.map(|_| ())
}
