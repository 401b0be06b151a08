/*
Dither and Noise Shaping
========================

Reducing word length (32-bit float → 16-bit) rounds every sample to the
nearest step of size 2 / 2^bits. Plain rounding makes the error correlated
with the signal, which is heard as distortion on quiet material. Adding a
little noise before rounding decorrelates it.

TPDF Dither
-----------

The difference of two uniform random numbers has a triangular probability
density over (-1, 1) step:

    d = u1 - u2,   u1, u2 ~ U(0, 1)

Triangular (rather than rectangular) dither makes both the mean and the
variance of the error independent of the signal.

Noise Shaping
-------------

The rounding error is fed back through a short FIR filter so its spectrum
moves out of the band where hearing is most sensitive (2-5 kHz) and towards
the top of the spectrum:

    v[n] = x[n] - Σ h[i] × e[n-1-i]
    q[n] = round(v[n] + d[n])
    e[n] = q[n] - v[n]

The coefficients are Lipshitz's five-tap E-weighted set. They are a static
table shared by every channel; only the error history is per channel.
*/

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Error-feedback taps, most recent error first.
pub const SHAPING_COEFFS: [f32; 5] = [2.033, -2.165, 1.959, -1.590, 0.6149];

/// Seed used when determinism is wanted but no seed was given.
pub const DEFAULT_SEED: u64 = 0x5eed_d17e;

/// Triangular-PDF noise in (-1, 1).
#[derive(Debug, Clone)]
pub struct TpdfNoise {
    rng: SmallRng,
}

impl TpdfNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.rng.gen::<f32>() - self.rng.gen::<f32>()
    }
}

impl Default for TpdfNoise {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// Quantizer step for a signed word of `bits` bits spanning [-1, 1].
#[inline]
pub fn quantization_step(bits: u32) -> f32 {
    2.0 / (1u64 << bits.clamp(1, 32)) as f32
}

/// Round `sample` to the nearest multiple of `step`.
#[inline]
pub fn quantize(sample: f32, step: f32) -> f32 {
    (sample / step).round() * step
}

/// Per-channel error history for noise shaping.
#[derive(Debug, Clone, Default)]
pub struct ErrorFeedback {
    history: [f32; SHAPING_COEFFS.len()],
}

impl ErrorFeedback {
    /// Filtered past error to subtract from the next input.
    #[inline]
    pub fn correction(&self) -> f32 {
        SHAPING_COEFFS
            .iter()
            .zip(&self.history)
            .map(|(h, e)| h * e)
            .sum()
    }

    #[inline]
    pub fn push(&mut self, error: f32) {
        self.history.copy_within(..SHAPING_COEFFS.len() - 1, 1);
        self.history[0] = error;
    }

    pub fn reset(&mut self) {
        self.history = [0.0; SHAPING_COEFFS.len()];
    }
}
