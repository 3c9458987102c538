//! Job state machine
//!
//! The only path through which a job's status, result and error fields change.
//! Every transition is checked against the current status and persisted in
//! the same store update.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::Result;
use super::{ArtifactRef, JobId, JobRecord, JobStore};

#[derive(Clone)]
pub struct JobStateMachine {
    store: Arc<dyn JobStore>,
}

impl JobStateMachine {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn transition_to_processing(&self, id: JobId) -> Result<JobRecord> {
        let job = self.store.update(id, &mut |job: &mut JobRecord| job.begin_processing())?;
        debug!("Job {} -> processing", id);
        Ok(job)
    }

    pub fn transition_to_completed(&self, id: JobId, result_ref: ArtifactRef) -> Result<JobRecord> {
        let job = self.store.update(id, &mut |job: &mut JobRecord| job.complete(result_ref.clone()))?;
        info!("Job {} completed: {}", id, result_ref);
        Ok(job)
    }

    pub fn transition_to_failed(&self, id: JobId, message: &str) -> Result<JobRecord> {
        let job = self.store.update(id, &mut |job: &mut JobRecord| job.fail(message))?;
        warn!("Job {} failed: {}", id, message);
        Ok(job)
    }
}
