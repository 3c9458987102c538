//! Durable storage for finished results

use std::path::{Path, PathBuf};

use log::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, VocalSwapError};
use crate::job::ArtifactRef;

/// Copies final artifacts out of a workspace into `<root>/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A fresh, not yet existing result path with the given extension.
    pub fn allocate(&self, extension: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            VocalSwapError::io(format!("Cannot create output directory {}: {}", self.root.display(), e))
        })?;
        Ok(self.root.join(format!("{}.{}", Uuid::new_v4(), extension)))
    }

    /// Remove a partially written result. Best effort.
    pub fn discard(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Discarded partial result {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot discard partial result {}: {}", path.display(), e),
        }
    }

    pub fn persist(&self, source: &Path) -> Result<ArtifactRef> {
        let extension = source.extension().and_then(|e| e.to_str()).unwrap_or("wav");
        let destination = self.allocate(extension)?;

        std::fs::copy(source, &destination).map_err(|e| {
            VocalSwapError::io(format!("Cannot store result {}: {}", source.display(), e))
        })?;
        debug!("Stored result {} -> {}", source.display(), destination.display());

        Ok(ArtifactRef::new(destination))
    }
}
