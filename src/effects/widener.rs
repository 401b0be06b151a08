//! Mid/side stereo widener.
//!
//! ```text
//!   mid  = (L + R) / 2
//!   side = (L - R) / 2 × width
//!   L'   = mid + side
//!   R'   = mid - side
//! ```
//!
//! Width 0 collapses to mono, 1 leaves the image alone, 2 doubles the side
//! signal. Only the first two channels form the stereo pair; any further
//! channels, and mono streams, pass through untouched.

use crate::effect::{Effect, Kernel};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::source::{AudioSource, StreamFormat};

pub const WIDTH: &str = "width";

pub struct StereoWidenerKernel {
    width: f32,
}

impl StereoWidenerKernel {
    pub fn new() -> Self {
        Self { width: 1.5 }
    }
}

impl Default for StereoWidenerKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for StereoWidenerKernel {
    fn register(&self, params: &mut ParameterStore) {
        params.register_ranged(WIDTH, 1.5, 0.0..=2.0);
    }

    fn on_parameter_changed(&mut self, name: &str, value: f32) {
        if name == WIDTH {
            self.width = value;
        }
    }

    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        wet.copy_from_slice(dry);

        let channels = format.channel_count();
        if channels < 2 {
            return;
        }

        for frame in wet.chunks_exact_mut(channels) {
            let (left, right) = (frame[0], frame[1]);
            let mid = (left + right) * 0.5;
            let side = (left - right) * 0.5 * self.width;
            frame[0] = mid + side;
            frame[1] = mid - side;
        }
    }
}

pub type StereoWidener<S> = Effect<S, StereoWidenerKernel>;

impl<S: AudioSource> Effect<S, StereoWidenerKernel> {
    pub fn new(source: S) -> Result<Self> {
        Effect::with_kernel(source, "Stereo Widener", StereoWidenerKernel::new(), 1.0)
    }

    pub fn width(&self) -> f32 {
        self.parameter(WIDTH)
    }

    /// Stereo width, clamped to [0, 2].
    pub fn set_width(&mut self, width: f32) {
        self.set_parameter(WIDTH, width);
    }
}
