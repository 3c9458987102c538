//! Sample rate conversion

use ndarray::{Array1, Array2, ArrayView1};

use crate::audio::{AudioData, Waveform};
use crate::error::{Result, VocalSwapError};

/// Highest sample rate accepted for conversion, in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

pub struct Resampler;

impl Resampler {
    /// Convert sample rate using linear interpolation
    pub fn convert_sample_rate(audio: &Waveform, target_sample_rate: u32) -> Result<Waveform> {
        for rate in [audio.sample_rate(), target_sample_rate] {
            if !(1..=MAX_SAMPLE_RATE).contains(&rate) {
                return Err(VocalSwapError::audio(format!(
                    "Sample rate {} Hz is outside 1..={} Hz",
                    rate, MAX_SAMPLE_RATE
                )));
            }
        }
        if audio.sample_rate() == target_sample_rate {
            return Ok(audio.clone());
        }

        let ratio = target_sample_rate as f64 / audio.sample_rate() as f64;
        let new_length = (audio.len() as f64 * ratio) as usize;

        let data = match audio.data() {
            AudioData::Mono(data) => AudioData::Mono(Self::resample_channel(data.view(), new_length, ratio)?),
            AudioData::Stereo(data) => {
                let (left, right) = rayon::join(
                    || Self::resample_channel(data.column(0), new_length, ratio),
                    || Self::resample_channel(data.column(1), new_length, ratio),
                );
                let mut stereo = Array2::zeros((new_length, 2));
                stereo.column_mut(0).assign(&left?);
                stereo.column_mut(1).assign(&right?);
                AudioData::Stereo(stereo)
            }
        };

        Ok(Waveform::new(target_sample_rate, data))
    }

    /// Bring the lower-rate signal up to the higher rate. The higher-rate
    /// signal is never touched.
    pub fn match_rates(a: &Waveform, b: &Waveform) -> Result<(Waveform, Waveform)> {
        match a.sample_rate().cmp(&b.sample_rate()) {
            std::cmp::Ordering::Less => Ok((Self::convert_sample_rate(a, b.sample_rate())?, b.clone())),
            std::cmp::Ordering::Greater => Ok((a.clone(), Self::convert_sample_rate(b, a.sample_rate())?)),
            std::cmp::Ordering::Equal => Ok((a.clone(), b.clone())),
        }
    }

    fn resample_channel(data: ArrayView1<f32>, new_length: usize, ratio: f64) -> Result<Array1<f32>> {
        if data.is_empty() {
            return Ok(Array1::zeros(new_length));
        }

        let old_length = data.len();
        let mut new_data = Array1::zeros(new_length);

        for i in 0..new_length {
            let old_pos = i as f64 / ratio;
            let old_index = old_pos.floor() as usize;
            let fraction = old_pos - old_index as f64;

            new_data[i] = if old_index >= old_length - 1 {
                data[old_length - 1]
            } else {
                data[old_index] + (data[old_index + 1] - data[old_index]) * fraction as f32
            };
        }

        Ok(new_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let audio = Waveform::mono(16000, vec![0.1, 0.2, 0.3]);
        let result = Resampler::convert_sample_rate(&audio, 16000).unwrap();
        assert_eq!(result, audio);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let audio = Waveform::mono(8000, vec![0.0, 1.0]);
        let result = Resampler::convert_sample_rate(&audio, 16000).unwrap();
        assert_eq!(result.sample_rate(), 16000);
        assert_eq!(result.data().samples(), vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_match_rates_only_upsamples() {
        let low = Waveform::mono(22050, vec![0.1; 100]);
        let high = Waveform::mono(44100, vec![0.2; 100]);

        let (a, b) = Resampler::match_rates(&high, &low).unwrap();
        assert_eq!(a, high);
        assert_eq!(b.sample_rate(), 44100);
        assert_eq!(b.len(), 200);

        let (a, b) = Resampler::match_rates(&low, &high).unwrap();
        assert_eq!(a.sample_rate(), 44100);
        assert_eq!(b, high);
    }

    #[test]
    fn test_stereo_channels_resampled_independently() {
        let data = ndarray::Array2::from(vec![[0.0, 1.0], [1.0, 0.0]]);
        let audio = Waveform::stereo(8000, data).unwrap();
        let result = Resampler::convert_sample_rate(&audio, 16000).unwrap();
        assert_eq!(result.channels(), 2);
        assert_eq!(result.data().samples(), vec![0.0, 1.0, 0.5, 0.5, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let audio = Waveform::mono(0, vec![0.1]);
        assert!(Resampler::convert_sample_rate(&audio, 16000).is_err());
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        let audio = Waveform::mono(1, vec![0.1; 4]);
        let result = Resampler::convert_sample_rate(&audio, u32::MAX);
        assert!(matches!(result, Err(VocalSwapError::Audio { .. })));

        let fast = Waveform::mono(MAX_SAMPLE_RATE + 1, vec![0.1; 4]);
        assert!(Resampler::match_rates(&audio, &fast).is_err());

        let edge = Resampler::convert_sample_rate(&Waveform::mono(192_000, vec![0.1; 4]), MAX_SAMPLE_RATE).unwrap();
        assert_eq!(edge.len(), 8);
    }
}
