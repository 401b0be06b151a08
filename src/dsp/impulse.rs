//! Impulse responses for convolution.
//!
//! An [`ImpulseResponse`] is a set of per-channel sample arrays at some
//! source sample rate. Everything here runs on the loading side, never in a
//! `read` call: resampling to the engine rate, trimming the silent tail,
//! reversing, and (with the `wav` feature) loading from disk.

use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl ImpulseResponse {
    /// Build from per-channel samples. Channels shorter than the longest are
    /// zero-padded.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::ImpulseFormat("sample rate must be positive".into()));
        }
        let len = channels.iter().map(Vec::len).max().unwrap_or(0);
        if len == 0 {
            return Err(Error::ImpulseFormat("impulse response is empty".into()));
        }
        if channels.iter().flatten().any(|s| !s.is_finite()) {
            return Err(Error::ImpulseFormat(
                "impulse response contains non-finite samples".into(),
            ));
        }

        let channels = channels
            .into_iter()
            .map(|mut samples| {
                samples.resize(len, 0.0);
                samples
            })
            .collect();

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Exponentially decaying noise burst, a stand-in room when no recorded
    /// response is loaded. Deterministic for a given `seed`.
    pub fn synthetic(sample_rate: u32, seconds: f32, channels: usize, seed: u64) -> Self {
        let len = ((seconds.max(0.001) * sample_rate.max(1) as f32) as usize).max(1);
        // -60 dB at the end of the response
        let decay = (0.001f32).ln() / len as f32;
        let mut rng = SmallRng::seed_from_u64(seed);

        let channels = (0..channels.max(1))
            .map(|_| {
                (0..len)
                    .map(|i| rng.gen_range(-1.0f32..1.0) * (decay * i as f32).exp())
                    .collect()
            })
            .collect();

        Self {
            channels,
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples driving stream channel `channel`; channels wrap, so a mono
    /// response feeds every output channel.
    pub fn channel_for(&self, channel: usize) -> &[f32] {
        &self.channels[channel % self.channels.len()]
    }

    /// Linearly resample to `target_rate`.
    pub fn resample(&self, target_rate: u32) -> Self {
        if target_rate == self.sample_rate || target_rate == 0 {
            return self.clone();
        }

        let step = self.sample_rate as f64 / target_rate as f64;
        let new_len = ((self.len() as f64 / step).ceil() as usize).max(1);
        log::debug!(
            "resampling impulse response {} Hz -> {} Hz ({} -> {} samples)",
            self.sample_rate,
            target_rate,
            self.len(),
            new_len
        );

        let channels = self
            .channels
            .iter()
            .map(|samples| {
                let last = samples.len() - 1;
                (0..new_len)
                    .map(|i| {
                        let pos = i as f64 * step;
                        let index = (pos as usize).min(last);
                        let frac = (pos - index as f64).clamp(0.0, 1.0) as f32;
                        let a = samples[index];
                        let b = samples[(index + 1).min(last)];
                        a + (b - a) * frac
                    })
                    .collect()
            })
            .collect();

        Self {
            channels,
            sample_rate: target_rate,
        }
    }

    /// Drop the tail after the last sample whose magnitude reaches
    /// `threshold` on any channel. At least one sample is kept.
    pub fn trim_decay(&self, threshold: f32) -> Self {
        let threshold = threshold.abs();
        let keep = (0..self.len())
            .rev()
            .find(|&i| self.channels.iter().any(|c| c[i].abs() >= threshold))
            .map(|i| i + 1)
            .unwrap_or(1);

        Self {
            channels: self
                .channels
                .iter()
                .map(|c| c[..keep].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Time-reversed copy.
    pub fn reversed(&self) -> Self {
        Self {
            channels: self
                .channels
                .iter()
                .map(|c| c.iter().rev().copied().collect())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Load a WAV file. Integer formats are scaled to [-1, 1].
    #[cfg(feature = "wav")]
    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ImpulseNotFound {
                path: path.to_path_buf(),
            });
        }

        let reader =
            hound::WavReader::open(path).map_err(|e| Error::ImpulseFormat(e.to_string()))?;
        let spec = reader.spec();
        let channel_count = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::ImpulseFormat(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::ImpulseFormat(e.to_string()))?
            }
        };

        let mut channels = vec![Vec::with_capacity(interleaved.len() / channel_count); channel_count];
        for frame in interleaved.chunks(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        log::info!(
            "loaded impulse response {} ({} ch, {} Hz)",
            path.display(),
            channel_count,
            spec.sample_rate
        );
        Self::new(channels, spec.sample_rate)
    }

    /// Without the `wav` feature only the missing-file check is available.
    #[cfg(not(feature = "wav"))]
    pub fn from_wav_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ImpulseNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(Error::ImpulseFormat(
            "built without the `wav` feature".into(),
        ))
    }
}
