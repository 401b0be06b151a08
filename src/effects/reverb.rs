//! Enhanced reverb: pre-delay into the comb/allpass network, with a decay
//! control that scales the comb feedback on top of the room size.

use crate::dsp::delay::DelayLine;
use crate::dsp::reverb::{decay_feedback, ReverbNetwork};
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const ROOM_SIZE: &str = "room_size";
pub const DAMPING: &str = "damping";
pub const DECAY: &str = "decay";
pub const PRE_DELAY_MS: &str = "pre_delay_ms";

pub(crate) const MAX_PRE_DELAY_MS: f32 = 500.0;
const DAMPING_SCALE: f32 = 0.4;

pub struct EnhancedReverbKernel {
    network: ReverbNetwork,
    pre_delay: Vec<DelayLine>,
    sample_rate: f32,
    room_size: f32,
    damping: f32,
    decay: f32,
    pre_delay_ms: f32,
}

impl EnhancedReverbKernel {
    pub fn new(format: StreamFormat) -> Self {
        let capacity = format.ms_to_frames(MAX_PRE_DELAY_MS).ceil() as usize + 1;
        Self {
            network: ReverbNetwork::new(format.sample_rate_f32(), format.channel_count()),
            pre_delay: (0..format.channel_count())
                .map(|_| DelayLine::with_capacity(capacity))
                .collect(),
            sample_rate: format.sample_rate_f32(),
            room_size: 0.5,
            damping: 0.5,
            decay: 1.0,
            pre_delay_ms: 20.0,
        }
    }
}

impl Kernel for EnhancedReverbKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(ROOM_SIZE, 0.5, 0.0..=1.0);
        params.register_ranged(DAMPING, 0.5, 0.0..=1.0);
        params.register_ranged(DECAY, 1.0, 0.1..=2.0);
        params.register_ranged(PRE_DELAY_MS, 20.0, 0.0..=MAX_PRE_DELAY_MS);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            ROOM_SIZE => self.room_size = value,
            DAMPING => self.damping = value,
            DECAY => self.decay = value,
            PRE_DELAY_MS => self.pre_delay_ms = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        self.network
            .set_feedback(decay_feedback(self.room_size, self.decay));
        self.network.set_damping(self.damping * DAMPING_SCALE);
        let pre_delay = (self.pre_delay_ms * self.sample_rate / 1000.0).round() as usize;

        let channels = format.channel_count();
        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for (c, ((line, &x), y)) in self
                .pre_delay
                .iter_mut()
                .zip(frame_in)
                .zip(frame_out)
                .enumerate()
            {
                let delayed = line.next_sample(x, pre_delay);
                *y = self.network.process(c, delayed);
            }
        }
    }

    fn reset(&mut self) {
        self.network.reset();
        for line in &mut self.pre_delay {
            line.reset();
        }
    }
}

pub type EnhancedReverb<S> = Effect<S, EnhancedReverbKernel>;

impl<S: AudioSource> Effect<S, EnhancedReverbKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(
            source,
            "Enhanced Reverb",
            EnhancedReverbKernel::new(format),
            0.3,
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

    pub fn decay(&self) -> f32 {
        self.parameter(DECAY)
    }

    /// Decay-time factor scaling the comb feedback, clamped to [0.1, 2].
    pub fn set_decay(&mut self, decay: f32) {
        self.set_parameter(DECAY, decay);
    }

    pub fn pre_delay_ms(&self) -> f32 {
        self.parameter(PRE_DELAY_MS)
    }

    pub fn set_pre_delay_ms(&mut self, pre_delay_ms: f32) {
        self.set_parameter(PRE_DELAY_MS, pre_delay_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferSource;

    fn impulse_reverb(frames: usize) -> EnhancedReverb<BufferSource> {
        let format = StreamFormat::new(44_100, 1);
        let mut reverb = EnhancedReverb::new(BufferSource::impulse(format, frames)).unwrap();
        reverb.set_mix(1.0);
        reverb
    }

    fn render(reverb: &mut EnhancedReverb<BufferSource>, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        let mut done = 0;
        while done < frames {
            let count = (frames - done).min(1024);
            let produced = reverb.read(&mut out, done, count);
            if produced == 0 {
                break;
            }
            done += produced;
        }
        out
    }

    #[test]
    fn test_pre_delay_holds_back_the_tail() {
        let mut reverb = impulse_reverb(8192);
        reverb.set_pre_delay_ms(0.0);
        let out = render(&mut reverb, 8192);
        // Shortest comb is 1116 samples at 44.1 kHz
        let first = out.iter().position(|s| s.abs() > 1e-6).unwrap();
        assert!((1116..1200).contains(&first), "first output at {first}");

        let mut delayed = impulse_reverb(8192);
        delayed.set_pre_delay_ms(100.0); // 4410 samples
        let out = render(&mut delayed, 8192);
        let first_delayed = out.iter().position(|s| s.abs() > 1e-6).unwrap();
        assert_eq!(first_delayed, first + 4410);
    }

    #[test]
    fn test_longer_decay_leaves_more_tail() {
        let tail_energy = |decay: f32| {
            let mut reverb = impulse_reverb(44_100);
            reverb.set_decay(decay);
            let out = render(&mut reverb, 44_100);
            out[22_050..].iter().map(|s| s * s).sum::<f32>()
        };

        assert!(tail_energy(1.3) > tail_energy(0.5) * 10.0);
    }

    #[test]
    fn test_stable_at_extremes() {
        let mut reverb = impulse_reverb(44_100 * 5);
        reverb.set_room_size(1.0);
        reverb.set_decay(2.0);
        reverb.set_damping(0.0);
        let out = render(&mut reverb, 44_100 * 5);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 4.0));
    }

    #[test]
    fn test_parameter_names_are_case_insensitive() {
        let mut reverb = impulse_reverb(16);
        reverb.set_parameter("Room_Size", 0.9);
        assert_eq!(reverb.room_size(), 0.9);
        assert_eq!(reverb.parameter("ROOM_SIZE"), 0.9);
    }
}
