//! Job submission and status queries on top of the worker pool

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::audio::AudioMixer;
use crate::config::Config;
use crate::error::{Result, VocalSwapError};
use crate::job::{ArtifactRef, InMemoryJobStore, JobId, JobRecord, JobStateMachine, JobStatusView, JobStore};
use crate::model::{FileModelRepository, VoiceModel};
use crate::pipeline::{
    ArtifactStore, CommandConverter, CommandEncoder, CommandSeparator, JobRunner, PipelineOrchestrator,
    StageAdapters, WorkerPool, WorkspaceManager,
};

/// What the service can actually do right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityReport {
    pub separation: String,
    pub conversion: String,
    pub encoder: String,
    pub voice_model: String,
    pub workers: usize,
}

impl fmt::Display for CapabilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Separation:  {}", self.separation)?;
        writeln!(f, "Conversion:  {}", self.conversion)?;
        writeln!(f, "Encoder:     {}", self.encoder)?;
        writeln!(f, "Voice model: {}", self.voice_model)?;
        write!(f, "Workers:     {}", self.workers)
    }
}

pub struct JobService {
    store: Arc<dyn JobStore>,
    voice_model: Arc<VoiceModel>,
    model_path: PathBuf,
    orchestrator: Arc<PipelineOrchestrator>,
    pool: Option<WorkerPool>,
}

impl JobService {
    /// Wire the service from configuration, probing external stage programs.
    pub fn from_config(config: &Config) -> Result<Self> {
        let adapters = StageAdapters {
            separation: CommandSeparator::detect(&config.separation),
            conversion: CommandConverter::detect(&config.converter),
            encoder: Arc::new(CommandEncoder::from_config(&config.encoder)),
        };
        Self::with_adapters(config, adapters)
    }

    /// Wire the service around caller-provided stage adapters.
    pub fn with_adapters(config: &Config, adapters: StageAdapters) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let voice_model = Arc::new(VoiceModel::new(Arc::new(FileModelRepository::new())));

        let service_model_path = config.model_path().to_path_buf();
        if config.model.preload {
            if let Err(e) = voice_model.load(&service_model_path) {
                warn!("Voice model not preloaded: {}", e);
            }
        }

        let orchestrator = Arc::new(
            PipelineOrchestrator::new(
                JobStateMachine::new(Arc::clone(&store)),
                WorkspaceManager::new(config.processing_root()),
                ArtifactStore::new(config.output_root()),
                adapters,
                Arc::clone(&voice_model),
            )
            .with_params(config.conversion.clone())
            .with_mixer(AudioMixer::new(config.mixer))
            .with_strict_encoder(config.strict_encoder()),
        );

        let runner: Arc<dyn JobRunner> = orchestrator.clone();
        let pool = WorkerPool::new(config.worker_count(), runner)?;
        info!("Job service ready: {:?}", orchestrator.adapters());

        Ok(Self {
            store,
            voice_model,
            model_path: service_model_path,
            orchestrator,
            pool: Some(pool),
        })
    }

    /// Create a queued job and hand it to the worker pool.
    pub fn submit<P, Q>(&self, song: P, voice: Q, consent_accepted: bool) -> Result<JobId>
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| VocalSwapError::processing("Job service is shut down"))?;

        let job = JobRecord::new(ArtifactRef::new(song), ArtifactRef::new(voice), consent_accepted)?;
        let id = job.id();

        if !self.voice_model.is_loaded() {
            if let Err(e) = self.voice_model.load(&self.model_path) {
                warn!("Voice model unavailable for job {}: {}", id, e);
            }
        }

        self.store.insert(job)?;
        pool.enqueue(id)?;
        info!("Job {} queued", id);

        Ok(id)
    }

    pub fn status(&self, id: JobId) -> Result<JobStatusView> {
        Ok(self.store.get(id)?.status_view())
    }

    /// All jobs, newest first.
    pub fn jobs(&self) -> Result<Vec<JobRecord>> {
        self.store.list()
    }

    pub fn voice_model(&self) -> &Arc<VoiceModel> {
        &self.voice_model
    }

    pub fn capabilities(&self) -> CapabilityReport {
        let adapters = self.orchestrator.adapters();
        CapabilityReport {
            separation: adapters.separation.describe(),
            conversion: adapters.conversion.describe(),
            encoder: format!("external ({})", adapters.encoder.extension()),
            voice_model: match self.voice_model.current() {
                Some(handle) => format!("{} ({})", handle.name(), handle.size_human_readable()),
                None => format!("not loaded ({})", self.model_path.display()),
            },
            workers: self.pool.as_ref().map_or(0, WorkerPool::size),
        }
    }

    /// Finish every queued job and stop the workers. Status queries keep
    /// working afterwards; submissions are rejected.
    pub fn shutdown(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}
