pub mod dsp;
pub mod effect; // Streaming contract and dry/wet hosting
pub mod effects; // Concrete effects built from the dsp primitives
pub mod error;
pub mod params;
pub mod source;

pub use effect::{Effect, Kernel, SampleFn};
pub use error::{Error, Result};
pub use params::ParameterStore;
pub use source::{AudioSource, StreamFormat};

/// Frames preallocated for each effect's scratch buffers.
pub const MAX_BLOCK_SIZE: usize = 2048;
