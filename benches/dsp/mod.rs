//! Benchmarks for DSP primitives and the effects built on them.

mod convolution;
mod delay;
mod effects;
mod pitch;
mod reverb;

pub use convolution::bench_convolution;
pub use delay::bench_delay;
pub use effects::bench_effects;
pub use pitch::bench_pitch;
pub use reverb::bench_reverb;
