//! Vocal / instrumental mixdown
//!
//! Combines the converted vocal take with the separated instrumental:
//! 1. the lower sample rate is brought up to the higher one,
//! 2. both signals are cut to the shorter length,
//! 3. samples are summed with per-track gains,
//! 4. if the sum peaks above full scale the whole signal is divided by the peak.
//!
//! The output depends only on the inputs and gains.

use serde::{Deserialize, Serialize};

use crate::audio::{AudioData, Resampler, Waveform};
use crate::error::{Result, VocalSwapError};

/// Full-scale amplitude on the normalized sample scale.
pub const FULL_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixGains {
    pub vocal_gain: f32,
    pub instrumental_gain: f32,
}

impl Default for MixGains {
    fn default() -> Self {
        Self {
            vocal_gain: 1.0,
            instrumental_gain: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AudioMixer {
    gains: MixGains,
}

impl AudioMixer {
    pub fn new(gains: MixGains) -> Self {
        Self { gains }
    }

    pub fn mix(&self, vocals: &Waveform, instrumental: &Waveform) -> Result<Waveform> {
        let (vocals, instrumental) =
            Resampler::match_rates(vocals, instrumental).map_err(|e| VocalSwapError::mixing(e.to_string()))?;
        let sample_rate = vocals.sample_rate();

        let frames = vocals.len().min(instrumental.len());
        if frames == 0 {
            return Err(VocalSwapError::EmptyInput);
        }

        let MixGains { vocal_gain, instrumental_gain } = self.gains;
        let vocals = vocals.data().truncated(frames);
        let instrumental = instrumental.data().truncated(frames);

        let mut mixed = match (&vocals, &instrumental) {
            (AudioData::Mono(v), AudioData::Mono(i)) => {
                AudioData::Mono(v.mapv(|x| x * vocal_gain) + i.mapv(|x| x * instrumental_gain))
            }
            (v, i) => {
                AudioData::Stereo(v.to_stereo().mapv(|x| x * vocal_gain) + i.to_stereo().mapv(|x| x * instrumental_gain))
            }
        };

        normalize_peak(&mut mixed);
        Ok(Waveform::new(sample_rate, mixed))
    }
}

/// Divide the signal by its peak when the peak exceeds full scale.
/// Returns the divisor that was applied, if any.
pub fn normalize_peak(data: &mut AudioData) -> Option<f32> {
    let peak = data.peak();
    if peak <= FULL_SCALE {
        return None;
    }

    match data {
        AudioData::Mono(samples) => samples.par_mapv_inplace(|x| x / peak),
        AudioData::Stereo(samples) => samples.par_mapv_inplace(|x| x / peak),
    }
    Some(peak)
}
