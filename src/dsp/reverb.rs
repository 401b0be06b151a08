//! Reverb - Room Simulation via Comb/Allpass Networks
//!
//! Reverb simulates the sound of a space by creating many delayed, filtered
//! reflections of the input signal. Every Schroeder-style reverb in this
//! crate shares the network below; the effects differ only in how they feed
//! it and how they derive its coefficients.
//!
//! # Architecture (per channel)
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         │      ...      ├──→ (avg) ──→ [AP 1] ──→ [AP 2] ──→ [AP 3] ──→ [AP 4] ──→ Output
//!         └──→ [Comb 8] ──┘
//! ```
//!
//! ## Comb Filters
//!
//! Each comb reads its delayed sample, runs it through a one-pole lowpass
//! (the damping control), and writes `input + filtered * feedback` back. The
//! comb outputs the *undamped* delayed read, so its output lags its writes by
//! exactly one delay length.
//!
//! ```text
//! y[n] = x[n - D] + feedback * lowpass(y[n - D])
//! ```
//!
//! Parallel combs with mutually prime-ish lengths build a dense decay without
//! piling resonances onto the same frequencies.
//!
//! ## Allpass Filters
//!
//! ```text
//! out   = -g * input + delayed
//! write =  input + g * delayed
//! ```
//!
//! with a fixed `g = 0.5`. Serial allpasses smear transients into a wash
//! without colouring the spectrum.
//!
//! # Stereo
//!
//! Each channel gets its own network with every delay lengthened by
//! `23 * channel` samples, so channels decorrelate instead of collapsing to
//! mono.
//!
//! # Stability
//!
//! Comb feedback is always clamped to [0.1, 0.98]. With the damping lowpass
//! in the loop (gain ≤ 1 at every frequency) the loop gain stays below one,
//! so any bounded input gives a bounded output.

use crate::dsp::delay::DelayLine;

/// Comb lengths in samples at 44.1 kHz.
const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
/// Allpass lengths in samples at 44.1 kHz.
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
/// Extra samples per channel index, decorrelating channels.
const STEREO_SPREAD: usize = 23;
const TUNING_RATE: f32 = 44_100.0;

pub const ALLPASS_GAIN: f32 = 0.5;
pub const MIN_FEEDBACK: f32 = 0.1;
pub const MAX_FEEDBACK: f32 = 0.98;

/// Comb feedback from room size alone: `0.28 + room_size * 0.7`, clamped.
#[inline]
pub fn room_feedback(room_size: f32) -> f32 {
    (0.28 + room_size * 0.7).clamp(MIN_FEEDBACK, MAX_FEEDBACK)
}

/// Comb feedback from room size scaled by a decay-time factor, clamped.
#[inline]
pub fn decay_feedback(room_size: f32, decay_scale: f32) -> f32 {
    ((0.28 + room_size * 0.7) * decay_scale).clamp(MIN_FEEDBACK, MAX_FEEDBACK)
}

/// A damped feedback comb filter.
pub struct CombFilter {
    line: DelayLine,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            line: DelayLine::with_capacity(delay_samples.max(1)),
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(MIN_FEEDBACK, MAX_FEEDBACK);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    pub fn delay_samples(&self) -> usize {
        self.line.capacity()
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        // Oldest sample, written exactly one delay length ago
        let output = self.line.read(self.line.capacity() - 1);

        // One-pole lowpass for damping (absorbs high frequencies)
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;

        self.line.write(input + self.filter_state * self.feedback);

        output
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.filter_state = 0.0;
    }
}

/// A fixed-gain allpass diffuser.
pub struct AllpassFilter {
    line: DelayLine,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            line: DelayLine::with_capacity(delay_samples.max(1)),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.read(self.line.capacity() - 1);
        self.line.write(input + delayed * ALLPASS_GAIN);
        -input * ALLPASS_GAIN + delayed
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }
}

/// The 8-comb, 4-allpass network for one channel.
pub struct ChannelNetwork {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
}

impl ChannelNetwork {
    pub fn new(sample_rate: f32, channel: usize) -> Self {
        let scale = sample_rate / TUNING_RATE;
        let spread = STEREO_SPREAD * channel;
        let length = |base: usize| (((base + spread) as f32) * scale).round().max(1.0) as usize;

        Self {
            combs: COMB_TUNING.map(|base| CombFilter::new(length(base))),
            allpasses: ALLPASS_TUNING.map(|base| AllpassFilter::new(length(base))),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 1.0 / self.combs.len() as f32;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }

        output
    }

    fn set_feedback(&mut self, feedback: f32) {
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
        }
    }

    fn set_damp(&mut self, damp: f32) {
        for comb in &mut self.combs {
            comb.set_damp(damp);
        }
    }

    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}

/// One comb/allpass network per channel, sized once at construction.
pub struct ReverbNetwork {
    channels: Vec<ChannelNetwork>,
}

impl ReverbNetwork {
    pub fn new(sample_rate: f32, channels: usize) -> Self {
        Self {
            channels: (0..channels.max(1))
                .map(|channel| ChannelNetwork::new(sample_rate, channel))
                .collect(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Apply a comb feedback coefficient (clamped to [0.1, 0.98]) everywhere.
    pub fn set_feedback(&mut self, feedback: f32) {
        for network in &mut self.channels {
            network.set_feedback(feedback);
        }
    }

    /// Apply a damping coefficient (clamped to [0, 1]) to every comb.
    pub fn set_damping(&mut self, damp: f32) {
        for network in &mut self.channels {
            network.set_damp(damp);
        }
    }

    /// Process one sample for `channel`; out-of-range channels wrap.
    #[inline]
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        let index = channel % self.channels.len();
        self.channels[index].process(input)
    }

    pub fn reset(&mut self) {
        for network in &mut self.channels {
            network.reset();
        }
    }
}
