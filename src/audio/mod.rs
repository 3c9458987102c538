//! Audio Module
//!
//! WAV reading and writing, sample rate conversion and the vocal/instrumental
//! mixdown used by the pipeline.

pub mod wav;
pub mod resample;
pub mod mixer;

pub use wav::{Waveform, AudioFormat, AudioData};
pub use resample::Resampler;
pub use mixer::{AudioMixer, MixGains};
