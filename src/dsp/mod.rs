//! Low-level DSP primitives the effects are assembled from.
//!
//! These components allocate only when they are built and are realtime-safe
//! afterwards, so kernels can own them directly. They stay focused on the
//! signal-processing math; parameter handling and dry/wet mixing live in
//! [`crate::effect`].

/// Block FFT convolution with overlap-add.
pub mod convolution;
/// Circular delay buffer with exact and interpolated reads.
pub mod delay;
/// Waveshapers: soft clip, tanh saturation, tape curve.
pub mod distortion;
/// Envelope follower for amplitude tracking.
pub mod envelope;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Impulse-response loading and preparation.
pub mod impulse;
/// Phase-accumulator oscillators for sweeps and carriers.
pub mod lfo;
/// Dry/wet blending.
pub mod mix;
/// TPDF dither and noise-shaping error feedback.
pub mod noise;
/// Two-grain pitch shifter.
pub mod pitch;
/// Comb/allpass reverb network.
pub mod reverb;

pub use convolution::ConvolutionEngine;
pub use delay::DelayLine;
pub use impulse::ImpulseResponse;
pub use pitch::GrainPitchShifter;
pub use reverb::ReverbNetwork;
