//! Flanger: a short delay swept by a sine LFO, with feedback.
//!
//! The delay moves between 1 ms and 1 ms + depth. Mixed with the dry signal
//! it cuts a comb of notches that slide up and down the spectrum; feedback
//! turns the notches into resonant peaks (negative feedback shifts them by
//! half a tooth). Each channel's LFO starts a quarter cycle later than the
//! previous one, which spreads the sweep across a stereo field.

use crate::dsp::delay::DelayLine;
use crate::dsp::distortion::saturate;
use crate::dsp::lfo::{bipolar_to_unipolar, Lfo};
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const RATE: &str = "rate";
pub const DEPTH_MS: &str = "depth_ms";
pub const FEEDBACK: &str = "feedback";

const BASE_DELAY_MS: f32 = 1.0;
const MAX_DEPTH_MS: f32 = 10.0;

pub struct FlangerKernel {
    lines: Vec<DelayLine>,
    lfos: Vec<Lfo>,
    sample_rate: f32,
    rate: f32,
    depth_ms: f32,
    feedback: f32,
}

impl FlangerKernel {
    pub fn new(format: StreamFormat) -> Self {
        let capacity = format.ms_to_frames(BASE_DELAY_MS + MAX_DEPTH_MS).ceil() as usize + 2;
        let channels = format.channel_count();

        Self {
            lines: (0..channels)
                .map(|_| DelayLine::with_capacity(capacity))
                .collect(),
            lfos: (0..channels)
                .map(|c| {
                    let mut lfo = Lfo::sine();
                    lfo.set_phase(c as f32 * 0.25);
                    lfo
                })
                .collect(),
            sample_rate: format.sample_rate_f32(),
            rate: 0.25,
            depth_ms: 2.0,
            feedback: 0.5,
        }
    }
}

impl Kernel for FlangerKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(RATE, 0.25, 0.01..=10.0);
        params.register_ranged(DEPTH_MS, 2.0, 0.0..=MAX_DEPTH_MS);
        params.register_ranged(FEEDBACK, 0.5, -0.95..=0.95);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            RATE => self.rate = value,
            DEPTH_MS => self.depth_ms = value,
            FEEDBACK => self.feedback = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let sample_rate = self.sample_rate;
        let base = BASE_DELAY_MS * sample_rate / 1000.0;
        let depth = self.depth_ms * sample_rate / 1000.0;
        let (rate, feedback) = (self.rate, self.feedback);

        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for (((line, lfo), &x), y) in self
                .lines
                .iter_mut()
                .zip(&mut self.lfos)
                .zip(frame_in)
                .zip(frame_out)
            {
                let sweep = bipolar_to_unipolar(lfo.next_sample(rate, sample_rate));
                let delayed = line.read_interpolated(base + depth * sweep - 1.0);
                line.write(x + saturate(delayed * feedback));
                *y = delayed;
            }
        }
    }

    fn reset(&mut self) {
        for (c, (line, lfo)) in self.lines.iter_mut().zip(&mut self.lfos).enumerate() {
            line.reset();
            lfo.set_phase(c as f32 * 0.25);
        }
    }
}

pub type Flanger<S> = Effect<S, FlangerKernel>;

impl<S: AudioSource> Effect<S, FlangerKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(source, "Flanger", FlangerKernel::new(format), 0.5)
    }

    pub fn rate(&self) -> f32 {
        self.parameter(RATE)
    }

    /// LFO rate in Hz, clamped to [0.01, 10].
    pub fn set_rate(&mut self, rate: f32) {
        self.set_parameter(RATE, rate);
    }

    pub fn depth_ms(&self) -> f32 {
        self.parameter(DEPTH_MS)
    }

    pub fn set_depth_ms(&mut self, depth_ms: f32) {
        self.set_parameter(DEPTH_MS, depth_ms);
    }

    pub fn feedback(&self) -> f32 {
        self.parameter(FEEDBACK)
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.set_parameter(FEEDBACK, feedback);
    }
}
