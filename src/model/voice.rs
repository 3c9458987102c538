//! The voice model handed to the conversion stage

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::info;

use crate::error::Result;
use super::{ModelHandle, ModelRepository};

/// Holds the currently selected voice model. The caller decides when a model
/// is loaded or unloaded; the orchestrator only reads `current()`.
pub struct VoiceModel {
    repository: Arc<dyn ModelRepository>,
    current: RwLock<Option<Arc<ModelHandle>>>,
}

impl VoiceModel {
    pub fn new(repository: Arc<dyn ModelRepository>) -> Self {
        Self {
            repository,
            current: RwLock::new(None),
        }
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<ModelHandle>> {
        let path = path.as_ref();
        let handle = self.repository.load(path)?;
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().map(|h| h.path()) != Some(path) {
            info!("Voice model selected: {}", handle.name());
        }
        *current = Some(Arc::clone(&handle));
        Ok(handle)
    }

    pub fn unload(&self) -> Option<Arc<ModelHandle>> {
        let previous = self.current.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = &previous {
            self.repository.unload(handle.path());
            info!("Voice model unloaded: {}", handle.name());
        }
        previous
    }

    pub fn current(&self) -> Option<Arc<ModelHandle>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }
}
