//! Harmonic exciter.
//!
//! Splits off everything above `frequency`, drives it through a soft clipper
//! to generate new upper harmonics, and adds `amount` of that back onto the
//! untouched signal. Material below the crossover passes nearly unchanged.

use crate::dsp::distortion::soft_clip;
use crate::dsp::filter::SVFilter;
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const FREQUENCY: &str = "frequency";
pub const DRIVE: &str = "drive";
pub const AMOUNT: &str = "amount";

pub struct ExciterKernel {
    filters: Vec<SVFilter>,
    sample_rate: f32,
    frequency: f32,
    drive: f32,
    amount: f32,
}

impl ExciterKernel {
    pub fn new(format: StreamFormat) -> Self {
        Self {
            filters: (0..format.channel_count())
                .map(|_| SVFilter::highpass(3000.0))
                .collect(),
            sample_rate: format.sample_rate_f32(),
            frequency: 3000.0,
            drive: 2.0,
            amount: 0.3,
        }
    }
}

impl Kernel for ExciterKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(FREQUENCY, 3000.0, 500.0..=12_000.0);
        params.register_ranged(DRIVE, 2.0, 1.0..=10.0);
        params.register_ranged(AMOUNT, 0.3, 0.0..=1.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            FREQUENCY => self.frequency = value,
            DRIVE => self.drive = value,
            AMOUNT => self.amount = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let (drive, amount) = (self.drive, self.amount);

        for filter in &mut self.filters {
            filter.set_cutoff(self.frequency);
        }
        // Every channel shares the cutoff, so one set of coefficients
        let (g, k) = match self.filters.first() {
            Some(filter) => (filter.coefficient(self.sample_rate), filter.damping()),
            None => return,
        };

        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            for ((filter, &x), y) in self.filters.iter_mut().zip(frame_in).zip(frame_out) {
                let highs = filter.tick(x, k, g);
                *y = x + amount * soft_clip(highs, drive);
            }
        }
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

pub type Exciter<S> = Effect<S, ExciterKernel>;

impl<S: AudioSource> Effect<S, ExciterKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(source, "Exciter", ExciterKernel::new(format), 1.0)
    }

    pub fn frequency(&self) -> f32 {
        self.parameter(FREQUENCY)
    }

    /// Crossover in Hz, clamped to [500, 12000].
    pub fn set_frequency(&mut self, frequency: f32) {
        self.set_parameter(FREQUENCY, frequency);
    }

    pub fn drive(&self) -> f32 {
        self.parameter(DRIVE)
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.set_parameter(DRIVE, drive);
    }

    pub fn amount(&self) -> f32 {
        self.parameter(AMOUNT)
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.set_parameter(AMOUNT, amount);
    }
}
