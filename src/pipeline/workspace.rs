//! Per-job scratch directories
//!
//! One directory per job under the processing root, named by job id. A
//! workspace is removed when released or dropped, whichever comes first.
//! Removal problems are logged and swallowed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Result, VocalSwapError};
use crate::job::JobId;

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, job_id: JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    pub fn acquire(&self, job_id: JobId) -> Result<Workspace> {
        let path = self.path_for(job_id);

        if path.exists() {
            warn!("Removing stale workspace {}", path.display());
            remove_dir(&path)?;
        }

        std::fs::create_dir_all(&path).map_err(|e| {
            VocalSwapError::workspace(format!("Cannot create workspace {}: {}", path.display(), e))
        })?;
        debug!("Workspace acquired: {}", path.display());

        Ok(Workspace { path, released: false })
    }

    /// Best-effort removal. Never fails.
    pub fn release(&self, workspace: Workspace) {
        if let Err(e) = workspace.release() {
            warn!("{}", e);
        }
    }
}

#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_dir(&self.path)?;
        debug!("Workspace released: {}", self.path.display());
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_dir(&self.path) {
            warn!("{}", e);
        }
    }
}

fn remove_dir(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(VocalSwapError::WorkspaceCleanupFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}
