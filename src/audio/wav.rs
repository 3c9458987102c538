//! In-memory waveforms and WAV file I/O

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ndarray::{s, Array1, Array2};

use crate::error::{Result, VocalSwapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Int16,
    Float32,
}

impl AudioFormat {
    pub fn to_wav_spec(self, channels: u16, sample_rate: u32) -> WavSpec {
        match self {
            AudioFormat::Int16 => WavSpec { channels, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int },
            AudioFormat::Float32 => WavSpec { channels, sample_rate, bits_per_sample: 32, sample_format: SampleFormat::Float },
        }
    }
}

/// Sample frames, normalized to [-1.0, 1.0]. Stereo is `frames x 2`.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioData {
    Mono(Array1<f32>),
    Stereo(Array2<f32>),
}

impl AudioData {
    /// Number of frames.
    pub fn len(&self) -> usize {
        match self {
            AudioData::Mono(data) => data.len(),
            AudioData::Stereo(data) => data.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> u16 {
        match self {
            AudioData::Mono(_) => 1,
            AudioData::Stereo(_) => 2,
        }
    }

    pub fn to_stereo(&self) -> Array2<f32> {
        match self {
            AudioData::Mono(data) => {
                let mut stereo = Array2::zeros((data.len(), 2));
                stereo.column_mut(0).assign(data);
                stereo.column_mut(1).assign(data);
                stereo
            }
            AudioData::Stereo(data) => data.clone(),
        }
    }

    /// Keep the first `frames` frames. Never pads.
    pub fn truncated(&self, frames: usize) -> AudioData {
        let frames = frames.min(self.len());
        match self {
            AudioData::Mono(data) => AudioData::Mono(data.slice(s![..frames]).to_owned()),
            AudioData::Stereo(data) => AudioData::Stereo(data.slice(s![..frames, ..]).to_owned()),
        }
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        let fold = |peak: f32, &x: &f32| peak.max(x.abs());
        match self {
            AudioData::Mono(data) => data.iter().fold(0.0, fold),
            AudioData::Stereo(data) => data.iter().fold(0.0, fold),
        }
    }

    pub fn samples(&self) -> Vec<f32> {
        match self {
            AudioData::Mono(data) => data.to_vec(),
            AudioData::Stereo(data) => data.iter().copied().collect(),
        }
    }
}

/// A decoded signal plus the rate it was sampled at.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    sample_rate: u32,
    data: AudioData,
}

impl Waveform {
    pub fn new(sample_rate: u32, data: AudioData) -> Self {
        Self { sample_rate, data }
    }

    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, AudioData::Mono(Array1::from(samples)))
    }

    pub fn stereo(sample_rate: u32, data: Array2<f32>) -> Result<Self> {
        if data.ncols() != 2 {
            return Err(VocalSwapError::audio("Stereo data must have 2 columns"));
        }
        Ok(Self::new(sample_rate, AudioData::Stereo(data)))
    }

    pub fn sample_rate(&self) -> u32 { self.sample_rate }
    pub fn data(&self) -> &AudioData { &self.data }
    pub fn len(&self) -> usize { self.data.len() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
    pub fn channels(&self) -> u16 { self.data.channels() }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .map_err(|e| VocalSwapError::audio(format!("Cannot open audio file {}: {}", path.display(), e)))?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(VocalSwapError::audio("Invalid sample rate"));
        }
        if spec.channels == 0 || spec.channels > 2 {
            return Err(VocalSwapError::audio(format!(
                "Only mono or stereo audio supported, got {} channels", spec.channels
            )));
        }

        let samples = read_samples(reader, spec)?;
        let data = if spec.channels == 1 {
            AudioData::Mono(Array1::from(samples))
        } else {
            let frames = samples.len() / 2;
            let stereo = Array2::from_shape_vec((frames, 2), samples[..frames * 2].to_vec())
                .map_err(|e| VocalSwapError::audio(format!("Malformed stereo data: {}", e)))?;
            AudioData::Stereo(stereo)
        };

        Ok(Self::new(spec.sample_rate, data))
    }

    /// Write as WAV. Samples are clamped to [-1.0, 1.0] on the way out.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P, format: AudioFormat) -> Result<()> {
        let path = path.as_ref();
        if self.sample_rate == 0 {
            return Err(VocalSwapError::audio("Cannot write audio with a sample rate of 0"));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VocalSwapError::audio(format!("Cannot create output directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| VocalSwapError::audio(format!("Cannot create output file {}: {}", path.display(), e)))?;
        let spec = format.to_wav_spec(self.channels(), self.sample_rate);
        let mut writer = WavWriter::new(BufWriter::new(file), spec)?;

        // Row-major iteration interleaves stereo frames.
        let samples: Box<dyn Iterator<Item = &f32> + '_> = match &self.data {
            AudioData::Mono(data) => Box::new(data.iter()),
            AudioData::Stereo(data) => Box::new(data.iter()),
        };

        for &sample in samples {
            let clamped = if sample.is_finite() { sample.clamp(-1.0, 1.0) } else { 0.0 };
            match format {
                AudioFormat::Float32 => writer.write_sample(clamped)?,
                AudioFormat::Int16 => writer.write_sample((clamped * 32767.0) as i16)?,
            }
        }

        writer.finalize()?;
        Ok(())
    }
}

fn read_samples<R: std::io::Read>(mut reader: WavReader<R>, spec: WavSpec) -> Result<Vec<f32>> {
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map_err(|e| VocalSwapError::audio(format!("Failed to read sample: {}", e))))
            .collect(),
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1i64 << (bits - 1)) as f32 - 1.0;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| v as f32 / scale)
                        .map_err(|e| VocalSwapError::audio(format!("Failed to read sample: {}", e)))
                })
                .collect()
        }
        (format, bits) => Err(VocalSwapError::audio(format!(
            "Unsupported sample format: {:?} {}-bit", format, bits
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_audio_data_operations() {
        let mono = AudioData::Mono(Array1::from(vec![0.1, -0.6, 0.3, 0.4]));
        assert_eq!(mono.len(), 4);
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.peak(), 0.6);

        let stereo = mono.to_stereo();
        assert_eq!(stereo.nrows(), 4);
        assert_eq!(stereo.ncols(), 2);
        assert_eq!(stereo[[1, 0]], stereo[[1, 1]]);

        let stereo = AudioData::Stereo(Array2::from(vec![[0.1, 0.3], [0.5, -0.9]]));
        assert_eq!(stereo.len(), 2);
        assert_eq!(stereo.peak(), 0.9);
    }

    #[test]
    fn test_truncated_never_pads() {
        let mono = AudioData::Mono(Array1::from(vec![0.1, 0.2, 0.3]));
        assert_eq!(mono.truncated(2).samples(), vec![0.1, 0.2]);
        assert_eq!(mono.truncated(10).len(), 3);
    }

    #[test]
    fn test_invalid_stereo_creation() {
        let data = Array2::from(vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]);
        assert!(Waveform::stereo(16000, data).is_err());
    }

    #[test]
    fn test_float_wav_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocals.wav");
        let original = Waveform::mono(44100, vec![0.1, -0.2, 0.3, 0.4, 0.5]);

        original.save_to_file(&path, AudioFormat::Float32).unwrap();
        let loaded = Waveform::from_file(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_int16_stereo_write_keeps_frames_interleaved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.wav");
        let original = Waveform::stereo(22050, Array2::from(vec![[0.5, -0.5], [0.25, 0.0]])).unwrap();

        original.save_to_file(&path, AudioFormat::Int16).unwrap();
        let loaded = Waveform::from_file(&path).unwrap();

        assert_eq!(loaded.sample_rate(), 22050);
        assert_eq!(loaded.channels(), 2);
        for (a, b) in loaded.data().samples().iter().zip(original.data().samples()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_missing_file_is_audio_error() {
        let result = Waveform::from_file("/nonexistent/instrumental.wav");
        assert!(matches!(result, Err(VocalSwapError::Audio { .. })));
    }
}
