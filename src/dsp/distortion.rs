//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. The "drive" parameter
//! controls how aggressively the signal is pushed into the nonlinear region.
//!
//! # How Waveshaping Works
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * drive)
//!
//! When drive is low (1.0), the signal stays in the linear region of f()
//! and passes through mostly unchanged. As drive increases, the signal hits
//! the nonlinear parts of f(), creating harmonic distortion.
//!
//! # Common Waveshaping Functions
//!
//! Soft Clip (tanh-style):
//!   f(x) = x / (1 + |x|)
//!   - Smooth, warm saturation
//!   - Gradually compresses peaks
//!   - Common in tube amp simulations
//!
//! Hard Clip:
//!   f(x) = clamp(x, -threshold, threshold)
//!   - Harsh, buzzy distortion
//!   - Creates odd harmonics (like square wave)
//!   - Dither uses it to keep requantized samples in range
//!
//! Tanh:
//!   f(x) = tanh(x)
//!   - Unity slope at zero, so quiet material passes untouched
//!   - What feedback loops and the tape model are built on
//!
//! # Drive Values
//!
//!   1.0  = Clean (no distortion)
//!   2-4  = Warm saturation
//!   5-10 = Obvious distortion
//!   10+  = Heavy, aggressive

/// Soft clipping using x / (1 + |x|) transfer function.
///
/// This produces warm, tube-like saturation that gradually
/// compresses peaks without harsh artifacts.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Hard clipping - simply clamps the signal at a threshold.
///
/// Creates harsh, buzzy distortion rich in odd harmonics.
/// Lower threshold = more distortion.
#[inline]
pub fn hard_clip(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;
    x.clamp(-threshold, threshold)
}

/// Tanh saturation with unity gain at the origin.
///
/// Nearly linear for quiet signals, bounded to (-1, 1) for loud ones. Every
/// feedback path runs through this before re-injection so a loop gain that
/// creeps past one saturates instead of blowing up.
#[inline]
pub fn saturate(sample: f32) -> f32 {
    sample.tanh()
}

/// Tape-style saturation.
///
/// A normalised tanh curve `s` plus a `bias × s²` term. The square term lifts
/// both half-waves the same way, so positive peaks saturate later than
/// negative ones and even harmonics appear. Output stays in [-1, 1] and a
/// full-scale positive input still lands at full scale.
#[inline]
pub fn tape_saturate(sample: f32, drive: f32, bias: f32) -> f32 {
    let drive = drive.max(1.0);
    let bias = bias.clamp(0.0, 1.0);
    let shaped = (drive * sample).tanh() / drive.tanh();
    (shaped + bias * shaped * shaped) / (1.0 + bias)
}
