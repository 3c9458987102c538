//! Job entity and its legal status transitions

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{Result, VocalSwapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = VocalSwapError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| VocalSwapError::processing(format!("Invalid job id {:?}: {}", s, e)))
    }
}

/// Reference to an audio artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(PathBuf);

impl ArtifactRef {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// `queued -> processing -> {completed, failed}` and nothing else.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A submitted voice-swap job.
///
/// Status, result and error fields can only change through the transition
/// methods below, which the state machine drives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    id: JobId,
    song_ref: ArtifactRef,
    voice_ref: ArtifactRef,
    consent_accepted: bool,
    status: JobStatus,
    result_ref: Option<ArtifactRef>,
    error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl JobRecord {
    pub fn new(song_ref: ArtifactRef, voice_ref: ArtifactRef, consent_accepted: bool) -> Result<Self> {
        if !consent_accepted {
            return Err(VocalSwapError::ConsentRequired);
        }

        let now = OffsetDateTime::now_utc();
        Ok(Self {
            id: JobId::new(),
            song_ref,
            voice_ref,
            consent_accepted,
            status: JobStatus::Queued,
            result_ref: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> JobId { self.id }
    pub fn song_ref(&self) -> &ArtifactRef { &self.song_ref }
    pub fn voice_ref(&self) -> &ArtifactRef { &self.voice_ref }
    pub fn consent_accepted(&self) -> bool { self.consent_accepted }
    pub fn status(&self) -> JobStatus { self.status }
    pub fn result_ref(&self) -> Option<&ArtifactRef> { self.result_ref.as_ref() }
    pub fn error_message(&self) -> Option<&str> { self.error_message.as_deref() }
    pub fn created_at(&self) -> OffsetDateTime { self.created_at }
    pub fn updated_at(&self) -> OffsetDateTime { self.updated_at }

    pub(crate) fn begin_processing(&mut self) -> Result<()> {
        self.advance(JobStatus::Processing)
    }

    pub(crate) fn complete(&mut self, result_ref: ArtifactRef) -> Result<()> {
        self.advance(JobStatus::Completed)?;
        self.result_ref = Some(result_ref);
        Ok(())
    }

    pub(crate) fn fail<S: Into<String>>(&mut self, message: S) -> Result<()> {
        self.advance(JobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    fn advance(&mut self, to: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(VocalSwapError::InvalidTransition { id: self.id, from: self.status, to });
        }
        self.status = to;
        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            id: self.id,
            status: self.status,
            result_ref: self.result_ref.clone().filter(|_| self.status == JobStatus::Completed),
            error_message: self.error_message.clone(),
        }
    }
}

/// Snapshot returned by status queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_job() -> JobRecord {
        JobRecord::new(ArtifactRef::new("song.wav"), ArtifactRef::new("voice.wav"), true).unwrap()
    }

    #[test]
    fn test_new_job_is_queued_without_outcome() {
        let job = queued_job();
        assert_eq!(job.status(), JobStatus::Queued);
        assert!(job.result_ref().is_none());
        assert!(job.error_message().is_none());
        assert_eq!(job.created_at(), job.updated_at());
    }

    #[test]
    fn test_consent_is_required() {
        let result = JobRecord::new(ArtifactRef::new("song.wav"), ArtifactRef::new("voice.wav"), false);
        assert!(matches!(result, Err(VocalSwapError::ConsentRequired)));
    }

    #[test]
    fn test_transition_table() {
        use JobStatus::*;
        let all = [Queued, Processing, Completed, Failed];
        for from in all {
            for to in all {
                let allowed = from.can_transition_to(to);
                let expected = matches!((from, to), (Queued, Processing) | (Processing, Completed) | (Processing, Failed));
                assert_eq!(allowed, expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_completion_sets_only_result() {
        let mut job = queued_job();
        job.begin_processing().unwrap();
        assert!(job.result_ref().is_none() && job.error_message().is_none());

        job.complete(ArtifactRef::new("out.mp3")).unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.result_ref().unwrap().path(), Path::new("out.mp3"));
        assert!(job.error_message().is_none());
    }

    #[test]
    fn test_failure_sets_only_message() {
        let mut job = queued_job();
        job.begin_processing().unwrap();
        job.fail("Separation failed: boom").unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error_message(), Some("Separation failed: boom"));
        assert!(job.result_ref().is_none());
    }

    #[test]
    fn test_terminal_jobs_cannot_move() {
        let mut job = queued_job();
        assert!(matches!(job.complete(ArtifactRef::new("x")), Err(VocalSwapError::InvalidTransition { .. })));

        job.begin_processing().unwrap();
        job.fail("boom").unwrap();
        assert!(job.begin_processing().is_err());
        assert!(job.complete(ArtifactRef::new("x")).is_err());
        assert!(job.fail("again").is_err());
        assert_eq!(job.error_message(), Some("boom"));
        assert!(job.result_ref().is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let view = queued_job().status_view();
        let text = toml::to_string(&view).unwrap();
        assert!(text.contains("status = \"queued\""));
        assert!(!text.contains("result_ref"));
    }

    #[test]
    fn test_job_id_parse() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }
}
