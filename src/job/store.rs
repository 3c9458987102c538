//! Job record storage

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, VocalSwapError};
use super::{JobId, JobRecord, JobStatus};

/// Persistence seam for job records.
///
/// `update` must apply the closure and persist the result atomically, so a
/// rejected transition leaves the stored record untouched.
pub trait JobStore: Send + Sync {
    /// Add a new record. Only `queued` records may enter the store; every
    /// later status is reached through `update`.
    fn insert(&self, job: JobRecord) -> Result<()>;

    fn get(&self, id: JobId) -> Result<JobRecord>;

    fn update(&self, id: JobId, apply: &mut dyn FnMut(&mut JobRecord) -> Result<()>) -> Result<JobRecord>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<JobRecord>>;
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: JobRecord) -> Result<()> {
        if job.status() != JobStatus::Queued {
            return Err(VocalSwapError::InvalidTransition {
                id: job.id(),
                from: job.status(),
                to: JobStatus::Queued,
            });
        }

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&job.id()) {
            return Err(VocalSwapError::processing(format!("Job {} already exists", job.id())));
        }
        jobs.insert(job.id(), job);
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<JobRecord> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&id).cloned().ok_or(VocalSwapError::JobNotFound(id))
    }

    fn update(&self, id: JobId, apply: &mut dyn FnMut(&mut JobRecord) -> Result<()>) -> Result<JobRecord> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let stored = jobs.get_mut(&id).ok_or(VocalSwapError::JobNotFound(id))?;

        let mut candidate = stored.clone();
        apply(&mut candidate)?;
        *stored = candidate.clone();
        Ok(candidate)
    }

    fn list(&self) -> Result<Vec<JobRecord>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<_> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(all)
    }
}
