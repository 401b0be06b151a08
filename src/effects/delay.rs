//! Feedback echo.
//!
//! ```text
//! input ──→ (+) ──→ [delay line] ──┬──→ wet
//!            ↑                      │
//!            └── tanh ←── × fb ←────┘
//! ```

use crate::dsp::delay::DelayLine;
use crate::dsp::distortion::saturate;
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const TIME_MS: &str = "time_ms";
pub const FEEDBACK: &str = "feedback";

const MAX_TIME_MS: f32 = 2000.0;

pub struct DelayKernel {
    lines: Vec<DelayLine>,
    sample_rate: f32,
    time_ms: f32,
    feedback: f32,
}

impl DelayKernel {
    pub fn new(format: StreamFormat) -> Self {
        // Largest delay plus room for the interpolation neighbour
        let capacity = format.ms_to_frames(MAX_TIME_MS).ceil() as usize + 2;
        Self {
            lines: (0..format.channel_count())
                .map(|_| DelayLine::with_capacity(capacity))
                .collect(),
            sample_rate: format.sample_rate_f32(),
            time_ms: 250.0,
            feedback: 0.35,
        }
    }
}

impl Kernel for DelayKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(TIME_MS, 250.0, 1.0..=MAX_TIME_MS);
        params.register_ranged(FEEDBACK, 0.35, 0.0..=0.95);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            TIME_MS => self.time_ms = value,
            FEEDBACK => self.feedback = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let delay = (self.time_ms * self.sample_rate / 1000.0).max(1.0);
        let feedback = self.feedback;

        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for ((line, &x), y) in self.lines.iter_mut().zip(frame_in).zip(frame_out) {
                // Nothing written yet this frame, so `delay` frames back is
                // `delay - 1` writes before the most recent one
                let delayed = line.read_interpolated(delay - 1.0);
                line.write(x + saturate(delayed * feedback));
                *y = delayed;
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
    }
}

pub type Delay<S> = Effect<S, DelayKernel>;

impl<S: AudioSource> Effect<S, DelayKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(source, "Delay", DelayKernel::new(format), 0.35)
    }

    pub fn time_ms(&self) -> f32 {
        self.parameter(TIME_MS)
    }

    /// Delay time in milliseconds, clamped to [1, 2000].
    pub fn set_time_ms(&mut self, time_ms: f32) {
        self.set_parameter(TIME_MS, time_ms);
    }

    pub fn feedback(&self) -> f32 {
        self.parameter(FEEDBACK)
    }

    /// Echo feedback, clamped to [0, 0.95].
    pub fn set_feedback(&mut self, feedback: f32) {
        self.set_parameter(FEEDBACK, feedback);
    }
}
