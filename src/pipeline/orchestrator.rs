//! Pipeline orchestrator
//!
//! Drives one job through `Separating -> Converting -> Mixing -> Encoding`.
//! Any stage error aborts the run and the job ends `failed` with that error's
//! message. The workspace is gone before the terminal status is written.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::audio::{AudioFormat, AudioMixer, Waveform};
use crate::error::{Result, StageFailure, VocalSwapError};
use crate::job::{ArtifactRef, JobId, JobRecord, JobStateMachine};
use crate::model::VoiceModel;
use super::adapters::{ConversionParams, ConversionRequest, SeparatedTracks, StageAdapters};
use super::artifacts::ArtifactStore;
use super::pool::JobRunner;
use super::workspace::{Workspace, WorkspaceManager};
use super::panic_message;

pub const MIXED_FILE: &str = "mixed.wav";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Separating,
    Converting,
    Mixing,
    Encoding,
    Done,
    Aborted,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Separating => "separating",
            Stage::Converting => "converting",
            Stage::Mixing => "mixing",
            Stage::Encoding => "encoding",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        }
    }

    pub fn next(self) -> Stage {
        match self {
            Stage::Separating => Stage::Converting,
            Stage::Converting => Stage::Mixing,
            Stage::Mixing => Stage::Encoding,
            Stage::Encoding => Stage::Done,
            terminal => terminal,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct PipelineOrchestrator {
    jobs: JobStateMachine,
    workspaces: WorkspaceManager,
    artifacts: ArtifactStore,
    adapters: StageAdapters,
    voice_model: Arc<VoiceModel>,
    params: ConversionParams,
    mixer: AudioMixer,
    strict_encoder: bool,
}

impl PipelineOrchestrator {
    pub fn new(
        jobs: JobStateMachine,
        workspaces: WorkspaceManager,
        artifacts: ArtifactStore,
        adapters: StageAdapters,
        voice_model: Arc<VoiceModel>,
    ) -> Self {
        Self {
            jobs,
            workspaces,
            artifacts,
            adapters,
            voice_model,
            params: ConversionParams::default(),
            mixer: AudioMixer::default(),
            strict_encoder: false,
        }
    }

    pub fn with_params(mut self, params: ConversionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_mixer(mut self, mixer: AudioMixer) -> Self {
        self.mixer = mixer;
        self
    }

    /// Treat encoder failure as job failure instead of delivering the WAV mix.
    pub fn with_strict_encoder(mut self, strict: bool) -> Self {
        self.strict_encoder = strict;
        self
    }

    pub fn adapters(&self) -> &StageAdapters {
        &self.adapters
    }

    /// Run a queued job to a terminal state.
    ///
    /// Returns an error only when the job could not be moved through the
    /// state machine (unknown id, not queued). Stage errors are recorded on the
    /// job and the terminal record is returned.
    pub fn process(&self, id: JobId) -> Result<JobRecord> {
        let job = self.jobs.transition_to_processing(id)?;
        info!("Job {}: processing started", id);
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(&job)))
            .unwrap_or_else(|payload| {
                Err(VocalSwapError::processing(format!(
                    "Unexpected fault: {}",
                    panic_message(payload.as_ref())
                )))
            });

        match outcome {
            Ok(result_ref) => {
                info!("Job {}: finished in {:.2}s", id, started.elapsed().as_secs_f64());
                self.jobs.transition_to_completed(id, result_ref)
            }
            Err(e) => self.jobs.transition_to_failed(id, &e.to_string()),
        }
    }

    fn execute(&self, job: &JobRecord) -> Result<ArtifactRef> {
        let workspace = self.workspaces.acquire(job.id())?;

        let mut stage = Stage::Separating;
        let outcome = self.run_stages(job, &workspace, &mut stage);
        match &outcome {
            Ok(_) => debug!("Job {}: {}", job.id(), Stage::Done),
            Err(e) => warn!("Job {}: {} during {}: {}", job.id(), Stage::Aborted, stage, e),
        }

        self.workspaces.release(workspace);
        outcome
    }

    fn run_stages(&self, job: &JobRecord, workspace: &Workspace, stage: &mut Stage) -> Result<ArtifactRef> {
        let id = job.id();

        debug!("Job {}: {}", id, stage);
        let tracks = self.separate(job, workspace)?;

        *stage = stage.next();
        debug!("Job {}: {}", id, stage);
        let converted = self.convert(job, &tracks, workspace)?;

        *stage = stage.next();
        debug!("Job {}: {}", id, stage);
        let mixed = self.mix(&converted, &tracks.instrumental, workspace)?;

        *stage = stage.next();
        debug!("Job {}: {}", id, stage);
        let result = self.encode(id, &mixed)?;
        *stage = stage.next();
        Ok(result)
    }

    fn separate(&self, job: &JobRecord, workspace: &Workspace) -> Result<SeparatedTracks> {
        let service = self.adapters.separation.get().map_err(VocalSwapError::SeparationFailed)?;

        let tracks = service
            .separate(job.song_ref().path(), workspace.path())
            .map_err(|e| VocalSwapError::SeparationFailed(e.into()))?;

        for track in [&tracks.vocals, &tracks.instrumental] {
            if !track.is_file() {
                return Err(VocalSwapError::SeparationFailed(StageFailure::Failed(format!(
                    "separated track missing: {}",
                    track.display()
                ))));
            }
        }
        Ok(tracks)
    }

    fn convert(&self, job: &JobRecord, tracks: &SeparatedTracks, workspace: &Workspace) -> Result<Waveform> {
        let service = self.adapters.conversion.get().map_err(VocalSwapError::ConversionFailed)?;
        let model = self.voice_model.current().ok_or_else(|| {
            VocalSwapError::ConversionFailed(StageFailure::Unavailable("no voice model loaded".to_string()))
        })?;

        let request = ConversionRequest {
            vocals: &tracks.vocals,
            voice_sample: job.voice_ref().path(),
            model: &model,
            params: &self.params,
            work_dir: workspace.path(),
        };

        let converted = service
            .convert(&request)
            .map_err(|e| VocalSwapError::ConversionFailed(e.into()))?;
        debug!(
            "Job {}: converted vocals {:.2}s at {} Hz",
            job.id(),
            converted.duration(),
            converted.sample_rate()
        );
        Ok(converted)
    }

    fn mix(&self, vocals: &Waveform, instrumental: &Path, workspace: &Workspace) -> Result<PathBuf> {
        let instrumental = Waveform::from_file(instrumental).map_err(mixing_failure)?;
        let mixed = self.mixer.mix(vocals, &instrumental).map_err(mixing_failure)?;

        let path = workspace.file(MIXED_FILE);
        mixed.save_to_file(&path, AudioFormat::Int16).map_err(mixing_failure)?;
        Ok(path)
    }

    /// Encode straight into the output root. On failure the partial output is
    /// discarded and the WAV mix is stored instead, unless encoding is strict.
    fn encode(&self, id: JobId, mixed: &Path) -> Result<ArtifactRef> {
        let encoder = &self.adapters.encoder;
        let output = self.artifacts.allocate(encoder.extension())?;

        match encoder.encode(mixed, &output) {
            Ok(()) => Ok(ArtifactRef::new(output)),
            Err(e) => {
                self.artifacts.discard(&output);
                if self.strict_encoder {
                    return Err(match e {
                        VocalSwapError::EncodingFailed { .. } => e,
                        other => VocalSwapError::encoding(other.to_string()),
                    });
                }
                warn!("Job {}: encoder unavailable, delivering uncompressed mix: {}", id, e);
                self.artifacts.persist(mixed)
            }
        }
    }
}

fn mixing_failure(err: VocalSwapError) -> VocalSwapError {
    match err {
        VocalSwapError::MixingFailed { .. } => err,
        other => VocalSwapError::mixing(other.to_string()),
    }
}

impl JobRunner for PipelineOrchestrator {
    fn run(&self, id: JobId) {
        if let Err(e) = self.process(id) {
            error!("Job {}: not processed: {}", id, e);
        }
    }
}
