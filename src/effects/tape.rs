//! Tape saturation.
//!
//! The tape curve compresses peaks with a slight asymmetry, then a lowpass
//! rolls off the top end the way a tape head does. `warmth` controls both:
//! more warmth means more bias (even harmonics) and a lower rolloff.
//!
//! | warmth | bias | rolloff  |
//! | ------ | ---- | -------- |
//! | 0.0    | 0.00 | 20 kHz   |
//! | 0.5    | 0.05 | 13 kHz   |
//! | 1.0    | 0.10 |  6 kHz   |

use crate::dsp::distortion::tape_saturate;
use crate::dsp::filter::SVFilter;
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const DRIVE: &str = "drive";
pub const WARMTH: &str = "warmth";

const MAX_BIAS: f32 = 0.1;
const BRIGHT_ROLLOFF_HZ: f32 = 20_000.0;
const DARK_ROLLOFF_HZ: f32 = 6_000.0;

pub struct TapeSaturationKernel {
    filters: Vec<SVFilter>,
    sample_rate: f32,
    drive: f32,
    warmth: f32,
}

impl TapeSaturationKernel {
    pub fn new(format: StreamFormat) -> Self {
        Self {
            filters: (0..format.channel_count())
                .map(|_| SVFilter::lowpass(BRIGHT_ROLLOFF_HZ))
                .collect(),
            sample_rate: format.sample_rate_f32(),
            drive: 1.5,
            warmth: 0.5,
        }
    }
}

impl Kernel for TapeSaturationKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(DRIVE, 1.5, 1.0..=10.0);
        params.register_ranged(WARMTH, 0.5, 0.0..=1.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            DRIVE => self.drive = value,
            WARMTH => self.warmth = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let drive = self.drive;
        let bias = self.warmth * MAX_BIAS;
        let rolloff = BRIGHT_ROLLOFF_HZ - (BRIGHT_ROLLOFF_HZ - DARK_ROLLOFF_HZ) * self.warmth;

        for filter in &mut self.filters {
            filter.set_cutoff(rolloff);
        }
        let (g, k) = match self.filters.first() {
            Some(filter) => (filter.coefficient(self.sample_rate), filter.damping()),
            None => return,
        };

        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for ((filter, &x), y) in self.filters.iter_mut().zip(frame_in).zip(frame_out) {
                *y = filter.tick(tape_saturate(x, drive, bias), k, g);
            }
        }
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

pub type TapeSaturation<S> = Effect<S, TapeSaturationKernel>;

impl<S: AudioSource> Effect<S, TapeSaturationKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(
            source,
            "Tape Saturation",
            TapeSaturationKernel::new(format),
            1.0,
        )
    }

    pub fn drive(&self) -> f32 {
        self.parameter(DRIVE)
    }

    /// Input drive, clamped to [1, 10].
    pub fn set_drive(&mut self, drive: f32) {
        self.set_parameter(DRIVE, drive);
    }

    pub fn warmth(&self) -> f32 {
        self.parameter(WARMTH)
    }

    pub fn set_warmth(&mut self, warmth: f32) {
        self.set_parameter(WARMTH, warmth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SineSource;

    fn rms_and_peak(drive: f32, warmth: f32) -> (f32, f32) {
        let format = StreamFormat::new(48_000, 1);
        let mut tape = TapeSaturation::new(SineSource::new(format, 200.0, 0.5)).unwrap();
        tape.set_drive(drive);
        tape.set_warmth(warmth);

        let mut out = vec![0.0; 9600];
        tape.read(&mut out, 0, 9600);
        let tail = &out[2400..];
        let rms = (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt();
        let peak = tail.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        (rms, peak)
    }

    #[test]
    fn test_drive_raises_density_without_exceeding_full_scale() {
        let (clean_rms, _) = rms_and_peak(1.0, 0.0);
        let (driven_rms, driven_peak) = rms_and_peak(8.0, 0.0);

        assert!(driven_rms > clean_rms * 1.3, "{driven_rms} vs {clean_rms}");
        assert!(driven_peak <= 1.05, "peak {driven_peak}");
    }

    #[test]
    fn test_warmth_introduces_asymmetry() {
        let format = StreamFormat::new(48_000, 1);
        let mut tape = TapeSaturation::new(SineSource::new(format, 100.0, 0.8)).unwrap();
        tape.set_drive(4.0);
        tape.set_warmth(1.0);

        let mut out = vec![0.0; 48_000];
        tape.read(&mut out, 0, 48_000);
        let max = out[4800..].iter().cloned().fold(f32::MIN, f32::max);
        let min = out[4800..].iter().cloned().fold(f32::MAX, f32::min);
        assert!((max + min).abs() > 0.01, "max={max} min={min}");
    }
}
