//! Worker pool - fixed set of threads fed from one FIFO queue

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::{Result, VocalSwapError};
use crate::job::JobId;
use super::panic_message;

/// Executes one job to completion on the calling thread.
pub trait JobRunner: Send + Sync {
    fn run(&self, id: JobId);
}

type InFlight = Arc<Mutex<HashSet<JobId>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashSet<JobId>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the id from the in-flight set when the run ends, panics included.
struct InFlightSlot<'a> {
    id: JobId,
    in_flight: &'a InFlight,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.id);
    }
}

struct Worker {
    index: usize,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(index: usize, queue: Receiver<JobId>, runner: Arc<dyn JobRunner>, in_flight: InFlight) -> Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("vocalswap-worker-{}", index))
            .spawn(move || {
                for id in queue.iter() {
                    let _slot = InFlightSlot { id, in_flight: &in_flight };
                    debug!("Worker {} picked job {}", index, id);

                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| runner.run(id))) {
                        error!("Worker {}: job {} panicked: {}", index, id, panic_message(payload.as_ref()));
                    }
                }
                debug!("Worker {} stopped", index);
            })
            .map_err(|e| VocalSwapError::processing(format!("Cannot spawn worker {}: {}", index, e)))?;

        Ok(Self { index, handle })
    }
}

pub struct WorkerPool {
    sender: Option<Sender<JobId>>,
    in_flight: InFlight,
    workers: Vec<Worker>,
}

impl WorkerPool {
    pub fn new(size: usize, runner: Arc<dyn JobRunner>) -> Result<Self> {
        let size = size.max(1);
        let (sender, queue) = unbounded::<JobId>();
        let in_flight: InFlight = Arc::default();

        let workers = (0..size)
            .map(|index| Worker::spawn(index, queue.clone(), Arc::clone(&runner), Arc::clone(&in_flight)))
            .collect::<Result<Vec<_>>>()?;
        info!("Worker pool started with {} workers", size);

        Ok(Self {
            sender: Some(sender),
            in_flight,
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job id. Returns `false` when the id is already queued or
    /// running; the duplicate is dropped.
    pub fn enqueue(&self, id: JobId) -> Result<bool> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| VocalSwapError::processing("Worker pool is shut down"))?;

        let mut in_flight = lock(&self.in_flight);
        if !in_flight.insert(id) {
            debug!("Job {} already in flight, ignoring duplicate", id);
            return Ok(false);
        }

        if sender.send(id).is_err() {
            in_flight.remove(&id);
            return Err(VocalSwapError::processing("Worker pool queue is closed"));
        }
        Ok(true)
    }

    /// Jobs queued or running.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Stop accepting work, finish everything already queued, join workers.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.handle.join().is_err() {
                error!("Worker {} terminated abnormally", worker.index);
            }
        }
        info!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}
