//! Voice conversion model repository
//!
//! Resolves model files to shared, read-only handles. Loading the same path
//! twice returns the cached handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};

use crate::error::{Result, VocalSwapError};

/// A loaded voice model. Immutable once created and shared across jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    /// Model file path
    path: PathBuf,
    /// Model name (file stem)
    name: String,
    /// Model size in bytes
    size: u64,
}

impl ModelHandle {
    /// Open a model file and capture its metadata
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(VocalSwapError::model(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| VocalSwapError::model(format!("Failed to read model file metadata: {}", e)))?;

        let name = path
            .file_stem()
            .and_then(|name| name.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get human-readable format of model file size
    pub fn size_human_readable(&self) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
        let mut size_f = self.size as f64;
        let mut unit_index = 0;

        while size_f >= 1024.0 && unit_index < UNITS.len() - 1 {
            size_f /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size_f, UNITS[unit_index])
    }
}

pub trait ModelRepository: Send + Sync {
    /// Idempotent per path.
    fn load(&self, path: &Path) -> Result<Arc<ModelHandle>>;

    /// Drop the cached handle. Returns whether one was cached.
    fn unload(&self, path: &Path) -> bool;
}

#[derive(Debug, Default)]
pub struct FileModelRepository {
    cache: RwLock<HashMap<PathBuf, Arc<ModelHandle>>>,
}

impl FileModelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ModelRepository for FileModelRepository {
    fn load(&self, path: &Path) -> Result<Arc<ModelHandle>> {
        if let Some(handle) = self.cache.read().unwrap_or_else(PoisonError::into_inner).get(path) {
            debug!("Model cache hit: {}", path.display());
            return Ok(Arc::clone(handle));
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have loaded it between the two locks.
        if let Some(handle) = cache.get(path) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(ModelHandle::open(path)?);
        info!("Loaded model {} ({})", handle.name(), handle.size_human_readable());
        cache.insert(path.to_path_buf(), Arc::clone(&handle));
        Ok(handle)
    }

    fn unload(&self, path: &Path) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }
}
