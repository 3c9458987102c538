//! Error Types

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// Why an external stage could not produce its output.
///
/// `Unavailable` means the backing service was never usable (not installed,
/// not configured, no model loaded). `Failed` means the call itself raised
/// while processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFailure {
    Unavailable(String),
    Failed(String),
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "service unavailable: {}", reason),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum VocalSwapError {
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition { id: JobId, from: JobStatus, to: JobStatus },

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Consent must be accepted before a job is created")]
    ConsentRequired,

    #[error("Separation failed: {0}")]
    SeparationFailed(StageFailure),

    #[error("Conversion failed: {0}")]
    ConversionFailed(StageFailure),

    #[error("Mixing failed: {message}")]
    MixingFailed { message: String },

    #[error("Encoding failed: {message}")]
    EncodingFailed { message: String },

    #[error("Mixer input is empty")]
    EmptyInput,

    #[error("Workspace error: {message}")]
    Workspace { message: String },

    #[error("Workspace cleanup failed for {}: {message}", path.display())]
    WorkspaceCleanupFailed { path: PathBuf, message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Model error: {message}")]
    Model { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },
}

impl VocalSwapError {
    pub fn mixing<S: Into<String>>(msg: S) -> Self { Self::MixingFailed { message: msg.into() } }
    pub fn encoding<S: Into<String>>(msg: S) -> Self { Self::EncodingFailed { message: msg.into() } }
    pub fn workspace<S: Into<String>>(msg: S) -> Self { Self::Workspace { message: msg.into() } }
    pub fn audio<S: Into<String>>(msg: S) -> Self { Self::Audio { message: msg.into() } }
    pub fn model<S: Into<String>>(msg: S) -> Self { Self::Model { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }
    pub fn processing<S: Into<String>>(msg: S) -> Self { Self::Processing { message: msg.into() } }
}

pub type Result<T> = std::result::Result<T, VocalSwapError>;

/// An adapter's error as recorded on the job: its own message, without the
/// crate-level category prefix.
impl From<VocalSwapError> for StageFailure {
    fn from(err: VocalSwapError) -> Self {
        match err {
            VocalSwapError::SeparationFailed(failure) | VocalSwapError::ConversionFailed(failure) => failure,
            VocalSwapError::Processing { message } => Self::Failed(message),
            other => Self::Failed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for VocalSwapError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<hound::Error> for VocalSwapError {
    fn from(err: hound::Error) -> Self { Self::audio(format!("WAV: {}", err)) }
}

impl From<toml::de::Error> for VocalSwapError {
    fn from(err: toml::de::Error) -> Self { Self::config(format!("Failed to parse config file: {}", err)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = VocalSwapError::audio("test");
        assert!(e.to_string().contains("Audio"));
    }

    #[test]
    fn test_stage_failure_kinds_are_distinct() {
        let missing = VocalSwapError::SeparationFailed(StageFailure::Unavailable("no separator".into()));
        let raised = VocalSwapError::SeparationFailed(StageFailure::Failed("exit status 2".into()));

        assert_eq!(missing.to_string(), "Separation failed: service unavailable: no separator");
        assert_eq!(raised.to_string(), "Separation failed: exit status 2");
    }

    #[test]
    fn test_adapter_error_keeps_its_own_message() {
        let failure = StageFailure::from(VocalSwapError::processing("separator crashed"));
        assert_eq!(failure, StageFailure::Failed("separator crashed".to_string()));

        let unavailable = StageFailure::Unavailable("no GPU".to_string());
        let passed = StageFailure::from(VocalSwapError::ConversionFailed(unavailable.clone()));
        assert_eq!(passed, unavailable);

        let audio = StageFailure::from(VocalSwapError::audio("bad header"));
        assert_eq!(audio, StageFailure::Failed("Audio error: bad header".to_string()));
    }
}
