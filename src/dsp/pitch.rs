//! Granular Pitch Shifting
//!
//! Two overlapping, Hann-windowed grains read from a circular input buffer
//! at `ratio` times the rate the buffer is written. Reading faster raises the
//! pitch, reading slower lowers it.
//!
//! ```text
//! input ──→ [ring buffer] ──┬──→ grain A × w(phase)          ──┐
//!                           └──→ grain B × w(phase + grain/2) ──┴──→ (+) ──→ output
//! ```
//!
//! A grain can only read so far before it catches up with the write cursor
//! (shifting up) or falls too far behind it (shifting down), so each grain
//! periodically jumps back to `write - grain_len`. The jump happens when the
//! grain's window is at zero, so it is inaudible; the other grain is at the
//! top of its window at that moment and carries the signal.
//!
//! The two windows are half a grain apart and a periodic Hann window
//! satisfies `w(n) + w(n + N/2) = 1`, so the two grains are summed without
//! halving and at `ratio = 1.0` the output is the input delayed by exactly
//! one grain length.
//!
//! This is the shifter that feeds the octave-up tail back into shimmer
//! reverbs every block.

use std::f32::consts::TAU;

pub const MIN_RATIO: f32 = 0.5;
pub const MAX_RATIO: f32 = 2.0;
const MIN_GRAIN: usize = 4;

/// Convert a semitone offset to a playback-rate ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}

/// Periodic Hann window of `len` points.
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (TAU * i as f32 / len as f32).cos()))
        .collect()
}

pub struct GrainPitchShifter {
    buffer: Vec<f32>,
    write_pos: usize,
    read_a: f32,
    read_b: f32,
    /// Primary grain phase in samples, always in [0, grain_len)
    phase: usize,
    window: Vec<f32>,
    ratio: f32,
}

impl GrainPitchShifter {
    /// `grain_len` is rounded up to an even number of at least four samples.
    pub fn new(grain_len: usize) -> Self {
        let grain_len = grain_len.max(MIN_GRAIN);
        let grain_len = grain_len + grain_len % 2;
        let capacity = grain_len * 4;
        let start = (capacity - grain_len) as f32;

        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            read_a: start,
            read_b: start,
            phase: 0,
            window: hann_window(grain_len),
            ratio: 1.0,
        }
    }

    /// Grain length for a duration in milliseconds.
    pub fn with_grain_ms(grain_ms: f32, sample_rate: f32) -> Self {
        Self::new((grain_ms * sample_rate / 1000.0).round().max(0.0) as usize)
    }

    pub fn grain_len(&self) -> usize {
        self.window.len()
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Playback ratio, clamped to [0.5, 2.0] so grains stay causal.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = if ratio.is_finite() {
            ratio.clamp(MIN_RATIO, MAX_RATIO)
        } else {
            1.0
        };
    }

    pub fn set_semitones(&mut self, semitones: f32) {
        self.set_ratio(semitones_to_ratio(semitones));
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let grain = self.window.len();
        let half = grain / 2;
        let capacity = self.buffer.len();

        self.buffer[self.write_pos] = input;

        let a = self.buffer[self.read_a as usize % capacity] * self.window[self.phase];
        let b = self.buffer[self.read_b as usize % capacity] * self.window[(self.phase + half) % grain];
        let output = a + b;

        self.write_pos = (self.write_pos + 1) % capacity;
        self.read_a = advance(self.read_a, self.ratio, capacity);
        self.read_b = advance(self.read_b, self.ratio, capacity);

        let anchor = ((self.write_pos + capacity - grain) % capacity) as f32;
        self.phase += 1;
        if self.phase == grain {
            self.phase = 0;
            self.read_a = anchor;
        } else if self.phase == half {
            // Grain B's window wraps here
            self.read_b = anchor;
        }

        output
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        let start = (self.buffer.len() - self.window.len()) as f32;
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.read_a = start;
        self.read_b = start;
        self.phase = 0;
    }
}

#[inline]
fn advance(position: f32, ratio: f32, capacity: usize) -> f32 {
    let next = position + ratio;
    if next >= capacity as f32 {
        next - capacity as f32
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_pairs_sum_to_one() {
        let window = hann_window(64);
        for i in 0..32 {
            assert!((window[i] + window[i + 32] - 1.0).abs() < 1e-5);
        }
        assert_eq!(window[0], 0.0);
    }

    #[test]
    fn test_grain_len_rounds_to_even() {
        assert_eq!(GrainPitchShifter::new(101).grain_len(), 102);
        assert_eq!(GrainPitchShifter::new(0).grain_len(), MIN_GRAIN);
    }

    #[test]
    fn test_unity_ratio_delays_by_one_grain() {
        let grain = 64;
        let mut shifter = GrainPitchShifter::new(grain);

        let input: Vec<f32> = (0..grain * 8).map(|i| (i as f32 * 0.05).sin()).collect();
        let output: Vec<f32> = input.iter().map(|&x| shifter.process(x)).collect();

        // After the first grain the output is the input one grain later
        for n in grain * 2..output.len() {
            assert!(
                (output[n] - input[n - grain]).abs() < 1e-4,
                "sample {n}: {} vs {}",
                output[n],
                input[n - grain]
            );
        }
    }

    #[test]
    fn test_ratio_is_clamped() {
        let mut shifter = GrainPitchShifter::new(64);
        shifter.set_ratio(8.0);
        assert_eq!(shifter.ratio(), MAX_RATIO);
        shifter.set_ratio(0.0);
        assert_eq!(shifter.ratio(), MIN_RATIO);
        shifter.set_ratio(f32::NAN);
        assert_eq!(shifter.ratio(), 1.0);
    }

    #[test]
    fn test_octave_up_raises_zero_crossing_rate() {
        let sample_rate = 48_000.0;
        let mut shifter = GrainPitchShifter::with_grain_ms(40.0, sample_rate);
        shifter.set_semitones(12.0);

        let freq = 200.0;
        let input: Vec<f32> = (0..48_000)
            .map(|i| (TAU * freq * i as f32 / sample_rate).sin())
            .collect();
        let output: Vec<f32> = input.iter().map(|&x| shifter.process(x)).collect();

        let crossings = |s: &[f32]| s.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        let in_rate = crossings(&input[8_000..]);
        let out_rate = crossings(&output[8_000..]);

        assert!(
            out_rate as f32 > in_rate as f32 * 1.6,
            "expected roughly doubled crossings: in={in_rate} out={out_rate}"
        );
    }

    #[test]
    fn test_output_bounded_for_bounded_input() {
        let mut shifter = GrainPitchShifter::new(256);
        shifter.set_ratio(0.5);
        for i in 0..20_000 {
            let out = shifter.process(if i % 2 == 0 { 1.0 } else { -1.0 });
            assert!(out.is_finite());
            assert!(out.abs() <= 1.0 + 1e-5);
        }
    }
}
