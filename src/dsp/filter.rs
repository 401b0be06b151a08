use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
State-Variable Filter
=====================

A trapezoidal-integrated (zero-delay feedback) SVF. One update produces all
four responses at once, so an effect picks whichever output it needs:

| type              | passes          | rejects      | used by                  |
| ----------------- | --------------- | ------------ | ------------------------ |
| low-pass          | below cutoff    | above cutoff | tape warmth              |
| high-pass         | above cutoff    | below cutoff | exciter side chain       |
| band-pass         | around cutoff   | far from it  | vocoder analysis bands   |
| notch / band-stop | away from it    | around it    |                          |

`resonance` runs 0..1; the damping term is k = 2 - 2 × resonance, so 1.0 is
self-oscillation. Effects keep it well below that.

The cutoff is pre-warped for the bilinear transform, which keeps the -3 dB
point where it was asked for even close to Nyquist. Cutoffs are clamped just
below Nyquist so the tan() stays finite.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
    pub notch: f32,
}

#[derive(Debug, Clone)]
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub resonance: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance: 0.0,
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz)
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz)
    }

    pub fn bandpass(cutoff_hz: f32) -> Self {
        Self::new(FilterType::BandPass, cutoff_hz)
    }

    pub fn notch(cutoff_hz: f32) -> Self {
        Self::new(FilterType::Notch, cutoff_hz)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Integrator gain for the current cutoff at `sample_rate`.
    #[inline]
    pub fn coefficient(&self, sample_rate: f32) -> f32 {
        let cutoff = self.cutoff_hz.clamp(1.0, sample_rate * 0.49);
        (TAU * cutoff / (2.0 * sample_rate)).tan()
    }

    /// Damping term for the current resonance.
    #[inline]
    pub fn damping(&self) -> f32 {
        2.0 - 2.0 * self.resonance.clamp(0.0, 0.99)
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32, k: f32, g: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - k * v1 - v2,
            notch: sample - k * v1,
        }
    }

    /// Filter one sample with precomputed coefficients, returning the
    /// response selected at construction.
    #[inline]
    pub fn tick(&mut self, sample: f32, k: f32, g: f32) -> f32 {
        let outputs = self.next_sample(sample, k, g);
        match self.filter_type {
            FilterType::LowPass => outputs.lowpass,
            FilterType::HighPass => outputs.highpass,
            FilterType::BandPass => outputs.bandpass,
            FilterType::Notch => outputs.notch,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let g = self.coefficient(sample_rate);
        let k = self.damping();

        for sample in buffer.iter_mut() {
            *sample = self.tick(*sample, k, g);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (TAU * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len().min(256);
        buffer
            .get(skip..)
            .unwrap_or(buffer)
            .iter()
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = vec![1.0; 512];

        filter.render(&mut buffer, SAMPLE_RATE);

        assert!(buffer[511] > 0.99);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = SVFilter::highpass(500.0);
        let mut buffer = vec![1.0; 512];

        filter.render(&mut buffer, SAMPLE_RATE);

        assert!(buffer[511].abs() < 0.001);
    }

    #[test]
    fn test_lowpass_filters_high_freq() {
        let mut filter = SVFilter::lowpass(500.0);
        let mut buffer = sine(5_000.0, 1024);

        filter.render(&mut buffer, SAMPLE_RATE);

        // Ten times the cutoff, 12 dB/octave
        let peak = peak_after_transient(&buffer);
        assert!(peak < 0.05, "expected high freq attenuation, got peak: {peak}");
    }

    #[test]
    fn test_bandpass_emphasizes_cutoff_frequency() {
        let mut filter = SVFilter::bandpass(1_000.0);
        filter.set_resonance(0.5);

        let mut pass = sine(1_000.0, 2048);
        filter.render(&mut pass, SAMPLE_RATE);
        let pass_peak = peak_after_transient(&pass);

        filter.reset();
        let mut off = sine(100.0, 2048);
        filter.render(&mut off, SAMPLE_RATE);
        let off_peak = peak_after_transient(&off);

        assert!(
            pass_peak > off_peak * 2.0,
            "pass_peak={pass_peak}, off_peak={off_peak}"
        );
    }

    #[test]
    fn test_notch_rejects_cutoff_frequency() {
        let mut filter = SVFilter::notch(1_000.0);
        filter.set_resonance(0.5);

        let mut center = sine(1_000.0, 4096);
        filter.render(&mut center, SAMPLE_RATE);
        let center_peak = peak_after_transient(&center[2048..]);

        filter.reset();
        let mut off = sine(100.0, 4096);
        filter.render(&mut off, SAMPLE_RATE);
        let off_peak = peak_after_transient(&off[2048..]);

        assert!(
            center_peak * 2.0 < off_peak,
            "center_peak={center_peak}, off_peak={off_peak}"
        );
    }

    #[test]
    fn test_cutoff_near_nyquist_stays_finite() {
        let mut filter = SVFilter::lowpass(30_000.0);
        let mut buffer = sine(10_000.0, 256);

        filter.render(&mut buffer, SAMPLE_RATE);

        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_set_cutoff_affects_filtering() {
        let mut filter = SVFilter::lowpass(200.0);
        let mut low = sine(1_000.0, 1024);
        filter.render(&mut low, SAMPLE_RATE);
        let peak_low_cutoff = peak_after_transient(&low);

        filter.reset();
        filter.set_cutoff(5_000.0);
        let mut high = sine(1_000.0, 1024);
        filter.render(&mut high, SAMPLE_RATE);
        let peak_high_cutoff = peak_after_transient(&high);

        assert!(
            peak_high_cutoff > peak_low_cutoff * 2.0,
            "high={peak_high_cutoff}, low={peak_low_cutoff}"
        );
    }

    #[test]
    fn test_resonance_boosts_cutoff() {
        let mut filter = SVFilter::lowpass(1_000.0);
        filter.set_resonance(0.1);
        let mut flat = sine(1_000.0, 2048);
        filter.render(&mut flat, SAMPLE_RATE);
        let peak_low_res = peak_after_transient(&flat);

        filter.reset();
        filter.set_resonance(0.8);
        let mut peaky = sine(1_000.0, 2048);
        filter.render(&mut peaky, SAMPLE_RATE);
        let peak_high_res = peak_after_transient(&peaky);

        assert!(
            peak_high_res > peak_low_res * 1.2,
            "high_res={peak_high_res}, low_res={peak_low_res}"
        );
    }
}
