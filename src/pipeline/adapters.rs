//! Stage adapter contracts
//!
//! The separation and conversion services wrap external machine-learning
//! tooling; the encoder wraps an external transcoder. The pipeline only sees
//! these traits, so tests can substitute in-process fakes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::Waveform;
use crate::error::{Result, StageFailure, VocalSwapError};
use crate::model::ModelHandle;

/// Whether a backing service can be used at all. Decided once at startup.
pub enum Capability<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Capability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    pub fn get(&self) -> std::result::Result<&T, StageFailure> {
        match self {
            Capability::Available(service) => Ok(service),
            Capability::Unavailable(reason) => Err(StageFailure::Unavailable(reason.clone())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Capability::Available(_) => "available".to_string(),
            Capability::Unavailable(reason) => format!("unavailable ({})", reason),
        }
    }
}

impl<T> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedTracks {
    pub vocals: PathBuf,
    pub instrumental: PathBuf,
}

pub trait SeparationService: Send + Sync {
    /// Split `song` into vocal and instrumental tracks written under `work_dir`.
    fn separate(&self, song: &Path, work_dir: &Path) -> Result<SeparatedTracks>;
}

/// Voice conversion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParams {
    /// Speaker index inside multi-speaker models
    pub speaker_id: u32,
    /// Pitch shift in semitones
    pub f0_up_key: i32,
    /// Pitch extraction method
    pub f0_method: String,
    /// Blend ratio of the retrieval index features
    pub index_rate: f32,
    /// Median filter radius applied to the pitch curve
    pub filter_radius: u32,
    /// Output resample rate, 0 keeps the model rate
    pub resample_sr: u32,
    /// Mix ratio between input and output loudness envelopes
    pub rms_mix_rate: f32,
    /// Voiceless consonant protection
    pub protect: f32,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            speaker_id: 0,
            f0_up_key: 0,
            f0_method: "rmvpe".to_string(),
            index_rate: 0.75,
            filter_radius: 3,
            resample_sr: 0,
            rms_mix_rate: 0.25,
            protect: 0.33,
        }
    }
}

impl ConversionParams {
    pub fn validate(&self) -> Result<()> {
        if !(-24..=24).contains(&self.f0_up_key) {
            return Err(VocalSwapError::config("Pitch shift must be within [-24, 24] semitones"));
        }
        if self.f0_method.trim().is_empty() {
            return Err(VocalSwapError::config("Pitch extraction method cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.index_rate) {
            return Err(VocalSwapError::config("Index rate must be in range [0.0, 1.0]"));
        }
        if self.filter_radius > 7 {
            return Err(VocalSwapError::config("Filter radius cannot exceed 7"));
        }
        if self.resample_sr > 192000 {
            return Err(VocalSwapError::config("Resample rate cannot exceed 192000 Hz"));
        }
        if !(0.0..=1.0).contains(&self.rms_mix_rate) {
            return Err(VocalSwapError::config("RMS mix rate must be in range [0.0, 1.0]"));
        }
        if !(0.0..=0.5).contains(&self.protect) {
            return Err(VocalSwapError::config("Protect must be in range [0.0, 0.5]"));
        }
        Ok(())
    }
}

pub struct ConversionRequest<'a> {
    pub vocals: &'a Path,
    pub voice_sample: &'a Path,
    pub model: &'a ModelHandle,
    pub params: &'a ConversionParams,
    /// Scratch directory the converter may write into.
    pub work_dir: &'a Path,
}

pub trait ConversionService: Send + Sync {
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Waveform>;
}

pub trait Encoder: Send + Sync {
    /// File extension of the encoded output.
    fn extension(&self) -> &str;

    /// Succeeds only when `output` was produced.
    fn encode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// The external collaborators one orchestrator runs against.
pub struct StageAdapters {
    pub separation: Capability<Arc<dyn SeparationService>>,
    pub conversion: Capability<Arc<dyn ConversionService>>,
    pub encoder: Arc<dyn Encoder>,
}

impl fmt::Debug for StageAdapters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageAdapters")
            .field("separation", &self.separation)
            .field("conversion", &self.conversion)
            .field("encoder", &self.encoder.extension())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = ConversionParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.f0_method, "rmvpe");
        assert_eq!(params.filter_radius, 3);
    }

    #[test]
    fn test_param_ranges() {
        let mut params = ConversionParams { index_rate: 1.5, ..Default::default() };
        assert!(params.validate().is_err());
        params.index_rate = 0.5;

        params.protect = 0.6;
        assert!(params.validate().is_err());
        params.protect = 0.33;

        params.f0_up_key = -30;
        assert!(params.validate().is_err());
        params.f0_up_key = -12;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_unavailable_capability_reports_reason() {
        let capability: Capability<u8> = Capability::Unavailable("separator not installed".into());
        assert!(!capability.is_available());
        assert_eq!(capability.get(), Err(StageFailure::Unavailable("separator not installed".into())));
        assert_eq!(capability.describe(), "unavailable (separator not installed)");
    }
}
