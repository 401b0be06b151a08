//! Concrete effects. Each is an [`Effect`](crate::Effect) over its own
//! kernel, constructed with `new(source)` and tuned through typed setters or
//! by parameter name.

pub mod convolution; // FFT convolution reverb over an impulse response
pub mod delay;
pub mod dither;
pub mod exciter;
pub mod flanger;
pub mod reverb; // Comb/allpass room with pre-delay
pub mod reverse;
pub mod shimmer; // Reverb with a pitch-shifted feedback loop
pub mod tape;
pub mod vocoder;
pub mod widener;

pub use convolution::ConvolutionReverb;
pub use delay::Delay;
pub use dither::Dither;
pub use exciter::Exciter;
pub use flanger::Flanger;
pub use reverb::EnhancedReverb;
pub use reverse::ReverseReverb;
pub use shimmer::ShimmerReverb;
pub use tape::TapeSaturation;
pub use vocoder::Vocoder;
pub use widener::StereoWidener;
