//! Word-length reduction with TPDF dither and optional noise shaping.
//!
//! The output is the input requantized to `bits` bits: every sample lands on
//! the grid a fixed-point converter of that depth can represent. See
//! [`crate::dsp::noise`] for the dither and shaping math.

use crate::dsp::distortion::hard_clip;
use crate::dsp::noise::{quantization_step, quantize, ErrorFeedback, TpdfNoise, DEFAULT_SEED};
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const BITS: &str = "bits";
pub const NOISE_SHAPING: &str = "noise_shaping";

pub struct DitherKernel {
    noise: TpdfNoise,
    feedback: Vec<ErrorFeedback>,
    bits: f32,
    noise_shaping: bool,
}

impl DitherKernel {
    pub fn new(format: StreamFormat, seed: u64) -> Self {
        Self {
            noise: TpdfNoise::new(seed),
            feedback: vec![ErrorFeedback::default(); format.channel_count()],
            bits: 16.0,
            noise_shaping: true,
        }
    }
}

impl Kernel for DitherKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(BITS, 16.0, 4.0..=24.0);
        params.register_ranged(NOISE_SHAPING, 1.0, 0.0..=1.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            BITS => self.bits = value,
            NOISE_SHAPING => {
                let enabled = value >= 0.5;
                if enabled != self.noise_shaping {
                    // Start from a clean history in either mode
                    for feedback in &mut self.feedback {
                        feedback.reset();
                    }
                }
                self.noise_shaping = enabled;
            }
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let step = quantization_step(self.bits.round() as u32);
        let shaping = self.noise_shaping;
        let ceiling = 1.0 - step;

        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for ((feedback, &x), y) in self.feedback.iter_mut().zip(frame_in).zip(frame_out) {
                let target = if shaping { x - feedback.correction() } else { x };
                let quantized = quantize(target + self.noise.next_sample() * step, step);
                if shaping {
                    feedback.push(quantized - target);
                }
                *y = hard_clip(quantized, 1.0, ceiling);
            }
        }
    }

    fn reset(&mut self) {
        for feedback in &mut self.feedback {
            feedback.reset();
        }
    }
}

pub type Dither<S> = Effect<S, DitherKernel>;

impl<S: AudioSource> Effect<S, DitherKernel> {
    pub fn new(source: S) -> Result<Self> {
        Self::with_seed(source, DEFAULT_SEED)
    }

    /// Dither with a specific noise seed; two instances with the same seed
    /// over the same input produce identical output.
    pub fn with_seed(source: S, seed: u64) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(source, "Dither", DitherKernel::new(format, seed), 1.0)
    }

    pub fn bits(&self) -> f32 {
        self.parameter(BITS)
    }

    /// Target word length, clamped to [4, 24] and rounded when applied.
    pub fn set_bits(&mut self, bits: f32) {
        self.set_parameter(BITS, bits);
    }

    pub fn noise_shaping(&self) -> bool {
        self.parameter(NOISE_SHAPING) >= 0.5
    }

    pub fn set_noise_shaping(&mut self, enabled: bool) {
        self.set_parameter(NOISE_SHAPING, if enabled { 1.0 } else { 0.0 });
    }
}
