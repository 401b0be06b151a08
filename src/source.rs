use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/*
Pull-Based Sources
==================

Everything in this crate is demand-pulled. A consumer (device callback,
offline renderer, another effect) asks the outermost stage for `count`
interleaved samples, that stage asks its upstream for the same amount, and so
on down to a generator. Nothing pushes.

  consumer ──read──→ [Reverb] ──read──→ [Delay] ──read──→ [Source]
           ←─block──          ←─block──         ←─block──

Interleaving
------------

Samples are interleaved frame by frame:

  [f0 c0, f0 c1, f1 c0, f1 c1, ...]

`count` is always a multiple of the channel count, and a source returns
fewer than `count` (or zero) once it runs dry. Effects forward that number
unchanged so end-of-stream propagates through a chain.
*/

/// Sample rate and channel layout of a stream.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub const fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }

    pub fn channel_count(&self) -> usize {
        self.channels as usize
    }

    pub fn sample_rate_f32(&self) -> f32 {
        self.sample_rate as f32
    }

    /// Convert milliseconds to a (fractional) frame count at this rate.
    #[inline]
    pub fn ms_to_frames(&self, ms: f32) -> f32 {
        ms * self.sample_rate as f32 / 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::invalid("sample rate must be positive"));
        }
        if self.channels == 0 {
            return Err(Error::invalid("channel count must be positive"));
        }
        Ok(())
    }
}

/// Anything an effect can pull interleaved samples from.
///
/// `read` fills `buffer[offset..offset + count]` and returns how many
/// samples it produced. Effects implement this too, which is what makes
/// chains composable.
pub trait AudioSource: Send {
    fn format(&self) -> StreamFormat;

    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize) -> usize;
}

impl AudioSource for Box<dyn AudioSource> {
    fn format(&self) -> StreamFormat {
        (**self).format()
    }

    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        (**self).read(buffer, offset, count)
    }
}

/// Endless source emitting the same value on every channel.
pub struct ConstantSource {
    format: StreamFormat,
    value: f32,
}

impl ConstantSource {
    pub fn new(format: StreamFormat, value: f32) -> Self {
        Self { format, value }
    }

    pub fn silence(format: StreamFormat) -> Self {
        Self::new(format, 0.0)
    }
}

impl AudioSource for ConstantSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        buffer[offset..offset + count].fill(self.value);
        count
    }
}

/// Finite source playing back a block of interleaved samples once.
pub struct BufferSource {
    format: StreamFormat,
    samples: Vec<f32>,
    position: usize,
}

impl BufferSource {
    pub fn new(format: StreamFormat, samples: Vec<f32>) -> Self {
        Self {
            format,
            samples,
            position: 0,
        }
    }

    /// A single 1.0 on every channel of the first frame, followed by `frames - 1`
    /// silent frames.
    pub fn impulse(format: StreamFormat, frames: usize) -> Self {
        let channels = format.channel_count();
        let mut samples = vec![0.0; frames * channels];
        for sample in samples.iter_mut().take(channels) {
            *sample = 1.0;
        }
        Self::new(format, samples)
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl AudioSource for BufferSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        let produced = count.min(self.remaining());
        buffer[offset..offset + produced]
            .copy_from_slice(&self.samples[self.position..self.position + produced]);
        self.position += produced;
        produced
    }
}

/// Endless sine test tone, identical on every channel.
pub struct SineSource {
    format: StreamFormat,
    frequency: f32,
    amplitude: f32,
    phase: f32,
}

impl SineSource {
    pub fn new(format: StreamFormat, frequency: f32, amplitude: f32) -> Self {
        Self {
            format,
            frequency,
            amplitude,
            phase: 0.0,
        }
    }
}

impl AudioSource for SineSource {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        let channels = self.format.channel_count();
        let phase_inc = TAU * self.frequency / self.format.sample_rate_f32();

        for frame in buffer[offset..offset + count].chunks_mut(channels) {
            let value = self.phase.sin() * self.amplitude;
            frame.fill(value);

            self.phase += phase_inc;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }
        count
    }
}
