//! Shimmer reverb.
//!
//! ```text
//! input ──→ (+) ──→ [reverb network] ──┬──────────────→ wet
//!            ↑                          │
//!            └── tanh ← × shimmer ← [pitch shift]
//! ```
//!
//! The reverb's output is pitch shifted (an octave up by default) and fed
//! back into its own input, so every pass through the loop climbs another
//! interval and the tail builds a bright cascade of harmonics. The
//! re-injection is saturated, which bounds the loop even when the shimmer
//! amount and room size are both at their maximum.

use crate::dsp::distortion::saturate;
use crate::dsp::pitch::GrainPitchShifter;
use crate::dsp::reverb::{room_feedback, ReverbNetwork};
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const ROOM_SIZE: &str = "room_size";
pub const DAMPING: &str = "damping";
pub const SHIMMER: &str = "shimmer";
pub const PITCH: &str = "pitch";

const GRAIN_MS: f32 = 50.0;
const DAMPING_SCALE: f32 = 0.5;

pub struct ShimmerReverbKernel {
    network: ReverbNetwork,
    shifters: Vec<GrainPitchShifter>,
    /// Last pitch-shifted sample per channel, waiting to be re-injected
    returns: Vec<f32>,
    room_size: f32,
    damping: f32,
    shimmer: f32,
    pitch: f32,
}

impl ShimmerReverbKernel {
    pub fn new(format: StreamFormat) -> Self {
        let channels = format.channel_count();
        let sample_rate = format.sample_rate_f32();
        Self {
            network: ReverbNetwork::new(sample_rate, channels),
            shifters: (0..channels)
                .map(|_| GrainPitchShifter::with_grain_ms(GRAIN_MS, sample_rate))
                .collect(),
            returns: vec![0.0; channels],
            room_size: 0.7,
            damping: 0.5,
            shimmer: 0.3,
            pitch: 12.0,
        }
    }
}

impl Kernel for ShimmerReverbKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(ROOM_SIZE, 0.7, 0.0..=1.0);
        params.register_ranged(DAMPING, 0.5, 0.0..=1.0);
        params.register_ranged(SHIMMER, 0.3, 0.0..=1.0);
        params.register_ranged(PITCH, 12.0, -12.0..=12.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            ROOM_SIZE => self.room_size = value,
            DAMPING => self.damping = value,
            SHIMMER => self.shimmer = value,
            PITCH => self.pitch = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        self.network.set_feedback(room_feedback(self.room_size));
        self.network.set_damping(self.damping * DAMPING_SCALE);
        for shifter in &mut self.shifters {
            shifter.set_semitones(self.pitch);
        }
        let shimmer = self.shimmer;

        let channels = format.channel_count();
        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for (c, (&x, y)) in frame_in.iter().zip(frame_out).enumerate() {
                let input = x + saturate(self.returns[c] * shimmer);
                let reverb = self.network.process(c, input);
                self.returns[c] = self.shifters[c].process(reverb);
                *y = reverb;
            }
        }
    }

    fn reset(&mut self) {
        self.network.reset();
        for shifter in &mut self.shifters {
            shifter.reset();
        }
        self.returns.fill(0.0);
    }
}

pub type ShimmerReverb<S> = Effect<S, ShimmerReverbKernel>;

impl<S: AudioSource> Effect<S, ShimmerReverbKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(
            source,
            "Shimmer Reverb",
            ShimmerReverbKernel::new(format),
            0.4,
        )
    }

    pub fn room_size(&self) -> f32 {
        self.parameter(ROOM_SIZE)
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.set_parameter(ROOM_SIZE, room_size);
    }

    pub fn damping(&self) -> f32 {
        self.parameter(DAMPING)
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.set_parameter(DAMPING, damping);
    }

    pub fn shimmer(&self) -> f32 {
        self.parameter(SHIMMER)
    }

    /// Amount of pitch-shifted tail fed back, clamped to [0, 1].
    pub fn set_shimmer(&mut self, shimmer: f32) {
        self.set_parameter(SHIMMER, shimmer);
    }

    pub fn pitch(&self) -> f32 {
        self.parameter(PITCH)
    }

    /// Shift interval in semitones, clamped to [-12, 12].
    pub fn set_pitch(&mut self, semitones: f32) {
        self.set_parameter(PITCH, semitones);
    }
}
