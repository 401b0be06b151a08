//! Channel vocoder.
//!
//! The input is the modulator. It is split into band-pass bands, and an
//! envelope follower on each band measures how loud that part of the
//! spectrum is. An internal sawtooth carrier runs through a matching filter
//! bank and each carrier band is scaled by its follower. Summing the bands
//! gives the carrier, shaped by the spectral contour of the input.
//!
//! ```text
//!   input ──► BP[b] ──► |env[b]| ─────┐
//!                                     ×──► Σ ──► makeup ──► out
//!   saw   ──► BP[b] ──────────────────┘
//! ```
//!
//! Bands are log-spaced from 100 Hz to 8 kHz and held below Nyquist. Each
//! band-pass is scaled by its damping, so every band peaks at unity gain.

use crate::dsp::envelope::EnvelopeFollower;
use crate::dsp::filter::SVFilter;
use crate::dsp::lfo::Lfo;
use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const CARRIER_HZ: &str = "carrier_hz";
pub const RELEASE_MS: &str = "release_ms";

pub const BANDS: usize = 16;
const LOWEST_BAND_HZ: f32 = 100.0;
const HIGHEST_BAND_HZ: f32 = 8_000.0;
/// Q around 3.4, enough for neighbouring bands to overlap at their edges
const BAND_RESONANCE: f32 = 0.85;
const ATTACK_MS: f32 = 2.0;
const MAKEUP_GAIN: f32 = 2.0;

struct Band {
    analysis: SVFilter,
    synthesis: SVFilter,
    follower: EnvelopeFollower,
}

pub struct VocoderKernel {
    /// One bank of bands per channel
    banks: Vec<Vec<Band>>,
    /// Integrator gains per band, shared by every channel
    coefficients: Vec<f32>,
    carrier: Lfo,
    sample_rate: f32,
    carrier_hz: f32,
    release_ms: f32,
}

impl VocoderKernel {
    pub fn new(format: StreamFormat) -> Self {
        let sample_rate = format.sample_rate_f32();
        let centers = band_centers(sample_rate);

        let banks = (0..format.channel_count())
            .map(|_| {
                centers
                    .iter()
                    .map(|&center| {
                        let mut analysis = SVFilter::bandpass(center);
                        analysis.set_resonance(BAND_RESONANCE);
                        let synthesis = analysis.clone();
                        Band {
                            analysis,
                            synthesis,
                            follower: EnvelopeFollower::new(ATTACK_MS, 20.0, sample_rate),
                        }
                    })
                    .collect()
            })
            .collect();

        let coefficients = centers
            .iter()
            .map(|&center| SVFilter::bandpass(center).coefficient(sample_rate))
            .collect();

        Self {
            banks,
            coefficients,
            carrier: Lfo::saw(),
            sample_rate,
            carrier_hz: 110.0,
            release_ms: 20.0,
        }
    }

    /// Center frequency of every band, lowest first.
    pub fn band_frequencies(&self) -> Vec<f32> {
        self.banks
            .first()
            .map(|bank| bank.iter().map(|band| band.analysis.cutoff_hz).collect())
            .unwrap_or_default()
    }
}

fn band_centers(sample_rate: f32) -> Vec<f32> {
    let ceiling = sample_rate * 0.45;
    let ratio = HIGHEST_BAND_HZ / LOWEST_BAND_HZ;
    (0..BANDS)
        .map(|b| {
            let t = b as f32 / (BANDS - 1) as f32;
            (LOWEST_BAND_HZ * ratio.powf(t)).min(ceiling)
        })
        .collect()
}

impl Kernel for VocoderKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(CARRIER_HZ, 110.0, 20.0..=2000.0);
        params.register_ranged(RELEASE_MS, 20.0, 1.0..=200.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        match name {
            CARRIER_HZ => self.carrier_hz = value,
            RELEASE_MS => self.release_ms = value,
            _ => {}
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        let k = 2.0 - 2.0 * BAND_RESONANCE;

        for bank in &mut self.banks {
            for band in bank.iter_mut() {
                band.follower.set_release(self.release_ms, self.sample_rate);
            }
        }

        for (frame_in, frame_out) in dry.chunks(channels).zip(wet.chunks_mut(channels)) {
            let saw = self.carrier.next_sample(self.carrier_hz, self.sample_rate);

            for ((bank, &x), y) in self.banks.iter_mut().zip(frame_in).zip(frame_out) {
                let mut sum = 0.0;
                for (band, &g) in bank.iter_mut().zip(&self.coefficients) {
                    let analysed = band.analysis.next_sample(x, k, g).bandpass * k;
                    let level = band.follower.next_sample(analysed);
                    let carrier = band.synthesis.next_sample(saw, k, g).bandpass * k;
                    sum += carrier * level;
                }
                *y = sum * MAKEUP_GAIN;
            }
        }
    }

    fn reset(&mut self) {
        for bank in &mut self.banks {
            for band in bank.iter_mut() {
                band.analysis.reset();
                band.synthesis.reset();
                band.follower.reset();
            }
        }
        self.carrier.reset();
    }
}

pub type Vocoder<S> = Effect<S, VocoderKernel>;

impl<S: AudioSource> Effect<S, VocoderKernel> {
    pub fn new(source: S) -> Result<Self> {
        let format = source.format();
        format.validate()?;
        Effect::with_kernel(source, "Vocoder", VocoderKernel::new(format), 1.0)
    }

    pub fn carrier_hz(&self) -> f32 {
        self.parameter(CARRIER_HZ)
    }

    /// Carrier pitch in Hz, clamped to [20, 2000].
    pub fn set_carrier_hz(&mut self, carrier_hz: f32) {
        self.set_parameter(CARRIER_HZ, carrier_hz);
    }

    pub fn release_ms(&self) -> f32 {
        self.parameter(RELEASE_MS)
    }

    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.set_parameter(RELEASE_MS, release_ms);
    }

    pub fn band_count(&self) -> usize {
        BANDS
    }
}
