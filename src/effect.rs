use crate::dsp::mix::apply_dry_wet;
use crate::error::{Error, Result};
use crate::params::{canonical_name, ParameterReceiver, ParameterStore};
use crate::source::{AudioSource, StreamFormat};
use crate::MAX_BLOCK_SIZE;

/*
Effect Processing Contract
==========================

Every effect in the crate is an `Effect<S, K>`: an upstream source `S` it
owns, plus a kernel `K` that knows how to turn one block of dry samples into
wet samples. The effect does the plumbing that is identical everywhere:

  1. pull `count` samples from upstream into the dry scratch buffer
  2. disabled?  copy dry straight to the output and stop
  3. kernel turns dry into wet
  4. output = dry × (1 - mix) + wet × mix

and returns whatever the upstream returned, so a finite source's
end-of-stream reaches the consumer unchanged.

Kernels
-------

Two shapes of transform are supported through one trait:

  Kernel      full control over a block (reverbs, convolution, anything with
              cross-channel or block-level state)
  SampleFn    a closure over (sample, channel), applied to every sample

The kernel is chosen at construction and dispatched statically.

Parameters
----------

Automation goes through names. `set_parameter` clamps through the store and
then calls `Kernel::on_parameter_changed` before returning, so a kernel can
mirror the value into a plain field instead of looking it up per sample.
Kernels derive their coefficients from those fields at the top of every
`process` call; nothing is cached across blocks.

The dry/wet amount is registered as the `mix` parameter, so `set_mix` and
`set_parameter("mix", ..)` are the same write.
*/

pub(crate) const MIX: &str = "mix";

/// The wet-signal half of an effect.
pub trait Kernel: Send {
    /// Register this kernel's parameters and their defaults.
    fn register(&self, _params: &mut ParameterStore) {}

    /// Called synchronously after every accepted parameter write with the
    /// lowercase name and the clamped value.
    fn on_parameter_changed(&mut self, _name: &str, _value: f32) {}

    /// Fill `wet` from `dry`. Both hold the same number of interleaved
    /// samples in `format`.
    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]);

    /// Clear delay lines and filter histories.
    fn reset(&mut self) {}
}

/// Per-sample kernel built from a closure over `(sample, channel)`.
pub struct SampleFn<F> {
    f: F,
}

impl<F> SampleFn<F>
where
    F: FnMut(f32, usize) -> f32 + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Kernel for SampleFn<F>
where
    F: FnMut(f32, usize) -> f32 + Send,
{
    fn process(&mut self, format: StreamFormat, dry: &[f32], wet: &mut [f32]) {
        let channels = format.channel_count();
        for (i, (&d, w)) in dry.iter().zip(wet.iter_mut()).enumerate() {
            *w = (self.f)(d, i % channels);
        }
    }
}

pub struct Effect<S, K> {
    name: String,
    source: S,
    format: StreamFormat,
    enabled: bool,
    mix: f32,
    params: ParameterStore,
    kernel: K,
    dry: Vec<f32>,
    wet: Vec<f32>,
}

impl<S: AudioSource, K: Kernel> Effect<S, K> {
    /// Wrap `source` with `kernel`.
    ///
    /// Fails with [`Error::InvalidArgument`] for an empty name or an
    /// upstream whose format has a zero sample rate or channel count.
    pub fn with_kernel(source: S, name: &str, kernel: K, default_mix: f32) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid("effect name must not be empty"));
        }
        if !default_mix.is_finite() {
            return Err(Error::invalid(format!(
                "effect {name} needs a finite default mix, got {default_mix}"
            )));
        }
        let format = source.format();
        format.validate()?;

        let mut params = ParameterStore::new();
        let mix = default_mix.clamp(0.0, 1.0);
        params.register_ranged(MIX, mix, 0.0..=1.0);
        kernel.register(&mut params);

        let mut kernel = kernel;
        for (param, value) in params.iter() {
            kernel.on_parameter_changed(param, value);
        }

        let scratch = MAX_BLOCK_SIZE * format.channel_count();
        log::debug!(
            "created effect {name} ({} Hz, {} ch, {} parameters)",
            format.sample_rate,
            format.channels,
            params.len()
        );

        Ok(Self {
            name: name.to_owned(),
            source,
            format,
            enabled: true,
            mix,
            params,
            kernel,
            dry: vec![0.0; scratch],
            wet: vec![0.0; scratch],
        })
    }

    /// Same as [`Effect::with_kernel`], for integrations that hold the
    /// upstream as an `Option`. A missing source is an invalid argument.
    pub fn try_with_kernel(
        source: Option<S>,
        name: &str,
        kernel: K,
        default_mix: f32,
    ) -> Result<Self> {
        let source = source
            .ok_or_else(|| Error::invalid(format!("effect {name} needs an upstream source")))?;
        Self::with_kernel(source, name, kernel, default_mix)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stream_format(&self) -> StreamFormat {
        self.format
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// Set the dry/wet amount, clamped to [0, 1].
    pub fn set_mix(&mut self, mix: f32) {
        self.set_parameter(MIX, mix);
    }

    pub fn parameter(&self, name: &str) -> f32 {
        self.params.get(name)
    }

    /// Write a parameter by name. Empty names and non-finite values are
    /// ignored; registered ranges clamp.
    pub fn set_parameter(&mut self, name: &str, value: f32) {
        let key = canonical_name(name);
        if let Some(stored) = self.params.set(&key, value) {
            if key == MIX {
                self.mix = stored;
            }
            self.kernel.on_parameter_changed(&key, stored);
        }
    }

    /// Add a parameter at runtime. Registration counts as a change, so the
    /// kernel sees the default immediately.
    ///
    /// Re-registering an existing name is a plain write: its range is kept
    /// and the value is clamped. Non-finite defaults are ignored.
    pub fn register_parameter(&mut self, name: &str, default: f32) {
        if name.is_empty() || !default.is_finite() {
            log::trace!("ignoring parameter registration {name:?} = {default}");
            return;
        }
        if self.params.contains(name) {
            self.set_parameter(name, default);
            return;
        }
        self.params.register(name, default);
        self.kernel
            .on_parameter_changed(&canonical_name(name), default);
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    /// Drain queued parameter writes. Call between reads on the thread that
    /// owns the chain.
    pub fn apply_pending<R: ParameterReceiver>(&mut self, receiver: &mut R) -> usize {
        let mut applied = 0;
        while let Some(change) = receiver.pop() {
            self.set_parameter(change.name, change.value);
            applied += 1;
        }
        applied
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwrap the effect, handing back its upstream.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Clear the kernel's DSP state. Parameters are untouched.
    pub fn reset(&mut self) {
        self.kernel.reset();
    }

    fn ensure_scratch(&mut self, count: usize) {
        if self.dry.len() < count {
            log::warn!(
                "effect {} growing scratch from {} to {} samples",
                self.name,
                self.dry.len(),
                count
            );
            self.dry.resize(count, 0.0);
            self.wet.resize(count, 0.0);
        }
    }
}

impl<S: AudioSource, K: Kernel> AudioSource for Effect<S, K> {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        self.ensure_scratch(count);

        let produced = self.source.read(&mut self.dry, 0, count).min(count);
        let dry = &self.dry[..produced];
        let out = &mut buffer[offset..offset + produced];

        if !self.enabled {
            out.copy_from_slice(dry);
            return produced;
        }

        let wet = &mut self.wet[..produced];
        self.kernel.process(self.format, dry, wet);

        out.copy_from_slice(wet);
        apply_dry_wet(dry, out, self.mix);

        produced
    }
}
