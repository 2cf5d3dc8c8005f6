//! Audio inputs and waveform staging.
//!
//! The editor hands audio to the node either as a file path or as an
//! in-memory tensor. Tensors arrive as
//!
//! | Rank | Layout                          |
//! |------|---------------------------------|
//! | 1    | `[samples]`                     |
//! | 2    | `[channels, samples]`           |
//! | 3    | `[batch = 1, channels, samples]`|
//!
//! and are staged to a 16-bit PCM WAV file before the inference pipeline sees
//! them, since the pipeline only reads audio from disk.

use std::path::Path;

use crate::error::{LipsyncError, Result};

/// Audio source for one invocation.
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Path typed into the editor; cleaned before use.
    Path(String),
    /// In-graph audio tensor.
    Waveform(Waveform),
}

/// A flat `f32` buffer in row-major order plus its shape and sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub sample_rate: u32,
}

/// A waveform reduced to `[channels, samples]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarAudio {
    pub channels: usize,
    pub samples: usize,
    /// Channel-major: all of channel 0, then all of channel 1, …
    pub data: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(data: Vec<f32>, shape: Vec<usize>, sample_rate: u32) -> Self {
        Self {
            data,
            shape,
            sample_rate,
        }
    }

    /// Mono waveform of rank 1.
    pub fn mono(data: Vec<f32>, sample_rate: u32) -> Self {
        let len = data.len();
        Self::new(data, vec![len], sample_rate)
    }

    /// Drop a unit batch dimension and promote mono input to one channel.
    pub fn to_planar(&self) -> Result<PlanarAudio> {
        let (channels, samples) = match self.shape.as_slice() {
            [samples] => (1, *samples),
            [channels, samples] => (*channels, *samples),
            [1, channels, samples] => (*channels, *samples),
            [batch, _, _] => {
                return Err(LipsyncError::malformed(format!(
                    "batch size must be 1, got {batch}"
                )))
            }
            other => {
                return Err(LipsyncError::malformed(format!(
                    "expected rank 1, 2 or 3, got rank {} (shape {:?})",
                    other.len(),
                    other
                )))
            }
        };

        if channels == 0 || samples == 0 {
            return Err(LipsyncError::malformed(format!(
                "empty waveform (shape {:?})",
                self.shape
            )));
        }
        if channels > u16::MAX as usize {
            return Err(LipsyncError::malformed(format!(
                "{channels} channels cannot be written to WAV"
            )));
        }
        let expected = channels.checked_mul(samples).ok_or_else(|| {
            LipsyncError::malformed(format!("shape {:?} overflows", self.shape))
        })?;
        if self.data.len() != expected {
            return Err(LipsyncError::malformed(format!(
                "shape {:?} needs {} values, buffer has {}",
                self.shape,
                expected,
                self.data.len()
            )));
        }
        if self.sample_rate == 0 {
            return Err(LipsyncError::malformed("sample rate must be positive"));
        }

        Ok(PlanarAudio {
            channels,
            samples,
            data: self.data.clone(),
            sample_rate: self.sample_rate,
        })
    }
}

impl PlanarAudio {
    /// Transpose to sample-major (interleaved) order: frame 0 of every
    /// channel, then frame 1, …
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for frame in 0..self.samples {
            for ch in 0..self.channels {
                out.push(self.data[ch * self.samples + frame]);
            }
        }
        out
    }

    /// Write a 16-bit PCM WAV file at the waveform's sample rate.
    pub fn write_pcm16(&self, output_path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(output_path, spec)?;
        for s in self.interleaved() {
            // f32 [-1.0, 1.0] → i16, clipping anything louder.
            let s16 = (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer.write_sample(s16)?;
        }
        writer.finalize()?;
        tracing::debug!(
            "Staged {} frames x {} channels ({:.2} s) to {}",
            self.samples,
            self.channels,
            self.samples as f32 / self.sample_rate as f32,
            output_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank1_promoted_to_single_channel() {
        let planar = Waveform::mono(vec![0.1, 0.2, 0.3], 16_000).to_planar().unwrap();
        assert_eq!((planar.channels, planar.samples), (1, 3));
    }

    #[test]
    fn test_rank2_kept() {
        let w = Waveform::new(vec![0.0; 8], vec![2, 4], 16_000);
        let planar = w.to_planar().unwrap();
        assert_eq!((planar.channels, planar.samples), (2, 4));
    }

    #[test]
    fn test_rank3_unit_batch_dropped() {
        let w = Waveform::new(vec![0.0; 6], vec![1, 2, 3], 44_100);
        let planar = w.to_planar().unwrap();
        assert_eq!((planar.channels, planar.samples), (2, 3));
        assert_eq!(planar.sample_rate, 44_100);
    }

    #[test]
    fn test_other_ranks_rejected() {
        for shape in [vec![], vec![1, 1, 2, 3]] {
            let len = shape.iter().product::<usize>();
            let w = Waveform::new(vec![0.0; len], shape.clone(), 16_000);
            let err = w.to_planar().unwrap_err();
            assert!(matches!(err, LipsyncError::MalformedWaveform { .. }), "{shape:?}");
        }
    }

    #[test]
    fn test_batch_larger_than_one_rejected() {
        let w = Waveform::new(vec![0.0; 8], vec![2, 1, 4], 16_000);
        assert!(matches!(
            w.to_planar(),
            Err(LipsyncError::MalformedWaveform { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let w = Waveform::new(vec![0.0; 5], vec![2, 3], 16_000);
        assert!(w.to_planar().is_err());
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let w = Waveform::new(vec![], vec![2, 1 << (usize::BITS - 1)], 16_000);
        assert!(matches!(
            w.to_planar(),
            Err(LipsyncError::MalformedWaveform { .. })
        ));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(Waveform::mono(vec![0.0; 4], 0).to_planar().is_err());
    }

    #[test]
    fn test_interleave_transposes() {
        // Channel 0: 1 2 3, channel 1: 10 20 30
        let w = Waveform::new(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0], vec![2, 3], 8_000);
        let planar = w.to_planar().unwrap();
        assert_eq!(planar.interleaved(), vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
    }

    #[test]
    fn test_write_pcm16_header_and_clipping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.wav");
        let w = Waveform::new(vec![0.5, 2.0, -2.0, 0.0], vec![1, 2, 2], 16_000);
        w.to_planar().unwrap().write_pcm16(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        // interleaved: [0.5, -2.0, 2.0, 0.0]
        assert_eq!(samples, vec![16_383, i16::MIN, i16::MAX, 0]);
    }
}
