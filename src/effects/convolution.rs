//! Convolution reverb: pre-delay, then FFT convolution with an impulse
//! response resampled to the stream rate.

use crate::dsp::convolution::ConvolutionEngine;
use crate::dsp::delay::DelayLine;
use crate::dsp::impulse::ImpulseResponse;
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

use super::reverb::MAX_PRE_DELAY_MS;

pub const PRE_DELAY_MS: &str = "pre_delay_ms";
pub const GAIN: &str = "gain";

/// Samples quieter than this at the end of a response are trimmed off.
pub const TRIM_THRESHOLD: f32 = 1e-5;
/// Length of the stand-in room used when no response is supplied.
const DEFAULT_IR_SECONDS: f32 = 1.0;
const DEFAULT_IR_SEED: u64 = 0x1e_7e_4b;

pub struct ConvolutionKernel {
    engine: ConvolutionEngine,
    pre_delay: Vec<DelayLine>,
    frame_in: Vec<f32>,
    frame_out: Vec<f32>,
    sample_rate: f32,
    pre_delay_ms: f32,
    gain: f32,
}

impl ConvolutionKernel {
    /// Prepare `ir` for `format`: resample to the stream rate, trim the
    /// silent tail, and transform.
    pub fn new(format: StreamFormat, ir: &ImpulseResponse) -> Result<Self> {
        let channels = format.channel_count();
        let prepared = ir
            .resample(format.sample_rate)
            .trim_decay(TRIM_THRESHOLD);
        let engine = ConvolutionEngine::new(&prepared, channels)?;

        log::info!(
            "convolution reverb: {} ch response, {} samples at {} Hz, latency {} frames",
            prepared.channel_count(),
            prepared.len(),
            format.sample_rate,
            engine.latency()
        );

        let capacity = format.ms_to_frames(MAX_PRE_DELAY_MS).ceil() as usize + 1;
        Ok(Self {
            engine,
            pre_delay: (0..channels)
                .map(|_| DelayLine::with_capacity(capacity))
                .collect(),
            frame_in: vec![0.0; channels],
            frame_out: vec![0.0; channels],
            sample_rate: format.sample_rate_f32(),
            pre_delay_ms: 0.0,
            gain: 1.0,
        })
    }

    pub fn latency(&self) -> usize {
        self.engine.latency()
    }
}

impl Kernel for ConvolutionKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(PRE_DELAY_MS, 0.0, 0.0..=MAX_PRE_DELAY_MS);
        params.register_ranged(GAIN, 1.0, 0.0..=4.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            PRE_DELAY_MS => self.pre_delay_ms = value,
            GAIN => self.gain = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let pre_delay = (self.pre_delay_ms * self.sample_rate / 1000.0).round() as usize;
        let gain = self.gain;

        for (frame_in, frame_out) in dry
            .chunks_exact(channels)
            .zip(wet.chunks_exact_mut(channels))
        {
            for ((line, &x), delayed) in self
                .pre_delay
                .iter_mut()
                .zip(frame_in)
                .zip(self.frame_in.iter_mut())
            {
                *delayed = line.next_sample(x, pre_delay);
            }

            self.engine.process_frame(&self.frame_in, &mut self.frame_out);

            for (y, &convolved) in frame_out.iter_mut().zip(&self.frame_out) {
                *y = convolved * gain;
            }
        }
    }

    fn reset(&mut self) {
        self.engine.reset();
        for line in &mut self.pre_delay {
            line.reset();
        }
    }
}

pub type ConvolutionReverb<S> = Effect<S, ConvolutionKernel>;

impl<S: AudioSource> Effect<S, ConvolutionKernel> {
    /// Convolution reverb over a synthetic one-second room.
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        let ir = ImpulseResponse::synthetic(
            format.sample_rate,
            DEFAULT_IR_SECONDS,
            format.channel_count().min(2),
            DEFAULT_IR_SEED,
        );
        Self::with_impulse(source, &ir)
    }

    /// Convolution reverb over a caller-supplied impulse response at any
    /// sample rate.
    pub fn with_impulse(source: S, ir: &ImpulseResponse) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        let kernel = ConvolutionKernel::new(format, ir)?;
        Effect::with_kernel(source, "Convolution Reverb", kernel, 0.35)
    }

    /// Reverse convolution: the response is played back to front, so each
    /// input swells in ahead of its tail instead of decaying after it.
    pub fn with_reversed_impulse(source: S, ir: &ImpulseResponse) -> Result<Self> {
        Self::with_impulse(source, &ir.reversed())
    }

    /// Swap in a new impulse response. Allocates; call between reads, away
    /// from the audio thread's deadline.
    pub fn load_impulse(&mut self, ir: &ImpulseResponse) -> Result<()> {
        let format = self.stream_format();
        let mut kernel = ConvolutionKernel::new(format, ir)?;
        for (name, value) in self.parameters().iter() {
            kernel.on_parameter_changed(name, value);
        }
        *self.kernel_mut() = kernel;
        Ok(())
    }

    /// Frames between input and the start of the convolved response.
    pub fn latency(&self) -> usize {
        self.kernel().latency()
    }

    pub fn pre_delay_ms(&self) -> f32 {
        self.parameter(PRE_DELAY_MS)
    }

    pub fn set_pre_delay_ms(&mut self, pre_delay_ms: f32) {
        self.set_parameter(PRE_DELAY_MS, pre_delay_ms);
    }

    pub fn gain(&self) -> f32 {
        self.parameter(GAIN)
    }

    /// Output gain on the convolved signal, clamped to [0, 4].
    pub fn set_gain(&mut self, gain: f32) {
        self.set_parameter(GAIN, gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferSource;

    fn unit_ir() -> ImpulseResponse {
        ImpulseResponse::mono(vec![1.0], 48_000).unwrap()
    }

    #[test]
    fn test_unit_response_passes_input_after_latency() {
        let format = StreamFormat::stereo(48_000);
        let frames = 256;
        let samples: Vec<f32> = (0..frames * 2).map(|i| (i as f32 * 0.1).sin()).collect();
        let source = BufferSource::new(format, samples.clone());

        let mut reverb = ConvolutionReverb::with_impulse(source, &unit_ir()).unwrap();
        reverb.set_mix(1.0);
        let latency = reverb.latency();

        let mut out = vec![0.0; frames * 2];
        reverb.read(&mut out, 0, frames * 2);

        for i in latency * 2..frames * 2 {
            assert!((out[i] - samples[i - latency * 2]).abs() < 1e-5, "sample {i}");
        }
    }

    #[test]
    fn test_pre_delay_and_gain() {
        let format = StreamFormat::new(48_000, 1);
        let source = BufferSource::impulse(format, 1024);
        let mut reverb = ConvolutionReverb::with_impulse(source, &unit_ir()).unwrap();
        reverb.set_mix(1.0);
        reverb.set_pre_delay_ms(5.0); // 240 frames
        reverb.set_gain(2.0);

        let mut out = vec![0.0; 1024];
        reverb.read(&mut out, 0, 1024);

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 240 + reverb.latency());
        assert!((out[peak] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_response_is_resampled_to_stream_rate() {
        // Two-tap response at 24 kHz: the second tap lands two frames later at 48 kHz
        let ir = ImpulseResponse::mono(vec![1.0, 0.5], 24_000).unwrap();
        let format = StreamFormat::new(48_000, 1);
        let mut reverb =
            ConvolutionReverb::with_impulse(BufferSource::impulse(format, 512), &ir).unwrap();
        reverb.set_mix(1.0);
        let latency = reverb.latency();

        let mut out = vec![0.0; 512];
        reverb.read(&mut out, 0, 512);

        assert!((out[latency] - 1.0).abs() < 1e-4);
        assert!((out[latency + 1] - 0.75).abs() < 1e-4);
        assert!((out[latency + 2] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_load_impulse_keeps_parameters() {
        let format = StreamFormat::new(48_000, 1);
        let mut reverb =
            ConvolutionReverb::with_impulse(BufferSource::impulse(format, 1024), &unit_ir())
                .unwrap();
        reverb.set_gain(0.5);
        reverb.set_mix(1.0);

        let ir = ImpulseResponse::mono(vec![0.0, 0.0, 1.0], 48_000).unwrap();
        reverb.load_impulse(&ir).unwrap();
        let latency = reverb.latency();

        let mut out = vec![0.0; 1024];
        reverb.read(&mut out, 0, 1024);
        assert!((out[latency + 2] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_reversed_response_swells() {
        let ir = ImpulseResponse::mono(vec![1.0, 0.5, 0.25], 48_000).unwrap();
        let format = StreamFormat::new(48_000, 1);
        let mut reverb =
            ConvolutionReverb::with_reversed_impulse(BufferSource::impulse(format, 512), &ir)
                .unwrap();
        reverb.set_mix(1.0);
        let latency = reverb.latency();

        let mut out = vec![0.0; 512];
        reverb.read(&mut out, 0, 512);

        assert!((out[latency] - 0.25).abs() < 1e-4);
        assert!((out[latency + 1] - 0.5).abs() < 1e-4);
        assert!((out[latency + 2] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_default_room_builds() {
        let format = StreamFormat::stereo(44_100);
        let reverb = ConvolutionReverb::new(BufferSource::impulse(format, 16)).unwrap();
        assert_eq!(reverb.mix(), 0.35);
        assert!(reverb.latency() >= 44_100);
    }
}
