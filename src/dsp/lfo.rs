//! Low frequency oscillators for sweeps and carriers.

/*
Low Frequency Oscillators
=========================

An LFO is simply an oscillator running at sub-audio frequencies. The same
waveform math applies, but the context and usage are completely different.

Vocabulary
----------

  audio-rate      Frequencies humans can hear: ~20 Hz to ~20,000 Hz.
                  These oscillators produce the actual sound you hear.

  control-rate    Frequencies below human hearing: ~0.01 Hz to ~20 Hz.
                  These oscillators modulate parameters over time.
                  "Control" because they control other things, not make sound.

  LFO             Low Frequency Oscillator. An oscillator at control-rate.
                  Typically outputs -1.0 to +1.0 (bipolar) for modulation.

  modulator       A signal that varies another signal's parameter.
                  LFOs are the classic modulator in synthesizers.

  period          Time for one complete oscillation.
                  At 5 Hz: period = 1/5 = 0.2 seconds = 200ms

  bipolar         Output swings positive AND negative: -1.0 to +1.0
                  Used when you want the parameter to go above AND below center.

  unipolar        Output is only positive: 0.0 to 1.0
                  Used when parameter should only move in one direction.
                  Convert: unipolar = (bipolar + 1.0) / 2.0


Typical LFO Frequencies
-----------------------

Different effects work best at different speeds:

    0.01 - 0.1 Hz   Very slow sweeps, evolving textures
    0.1 - 0.5 Hz    Slow sweeps, gradual filter movement
    0.5 - 2 Hz      Classic tremolo, auto-pan
    2 - 7 Hz        Vibrato sweet spot
    7 - 15 Hz       Fast tremolo, "helicopter" effect
    > 15 Hz         Approaching audio rate (FM/AM territory)

At the upper end (~20 Hz), you cross into audio-rate territory. This creates
FM (frequency modulation) or AM (amplitude modulation) effects, which produce
sidebands and new harmonic content rather than perceived "wobble."


Common LFO Shapes
-----------------

Each waveform creates a different character of movement:

SINE
    Smooth, natural, organic sweep. The most common choice.
    Good for: flanger sweeps, vibrato

SAWTOOTH (Ramp)
    Gradual rise, instant reset (or vice versa).
    Creates rhythmic, one-directional sweeps.
    Good for: risers, and as a harmonically rich carrier

    Rising saw:  ╱╱╱╱   (gradual up, snap down)
    Falling saw: ╲╲╲╲   (gradual down, snap up)

Audio Rate
----------

Nothing here stops an LFO running at audio rate. The vocoder's carrier is
the same phase accumulator as a saw at 110 Hz; only the name changes.


Phase Accumulator
-----------------

Phase lives in [0, 1) and advances by freq / sample_rate per sample. The
waveforms are pure functions of phase, so changing frequency mid-sweep never
causes a jump in the output.

    phase      0.0   0.25   0.5   0.75
    sine       0.0   1.0    0.0  -1.0
    saw       -1.0  -0.5    0.0   0.5

Flangers offset the starting phase per channel instead of per waveform.


Bipolar to Unipolar Conversion
------------------------------

Many parameters want unipolar (0 to 1) rather than bipolar (-1 to +1):

    unipolar = (bipolar + 1.0) * 0.5

    bipolar   unipolar
    -1.0      0.0
     0.0      0.5
    +1.0      1.0

Delay-time modulation is unipolar: the delay sweeps between a floor and
floor + depth, never below zero.
*/

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoShape {
    Sine,
    Saw,
}

#[derive(Debug, Clone)]
pub struct Lfo {
    shape: LfoShape,
    phase: f32,
}

impl Lfo {
    pub fn new(shape: LfoShape) -> Self {
        Self { shape, phase: 0.0 }
    }

    pub fn sine() -> Self {
        Self::new(LfoShape::Sine)
    }

    pub fn saw() -> Self {
        Self::new(LfoShape::Saw)
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Start the cycle at `phase` (wrapped into [0, 1)).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Current bipolar value, then advance one sample at `frequency_hz`.
    #[inline]
    pub fn next_sample(&mut self, frequency_hz: f32, sample_rate: f32) -> f32 {
        let value = shape_at(self.shape, self.phase);
        self.phase += frequency_hz / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Bipolar value of `shape` at `phase` in [0, 1).
#[inline]
pub fn shape_at(shape: LfoShape, phase: f32) -> f32 {
    match shape {
        LfoShape::Sine => (TAU * phase).sin(),
        LfoShape::Saw => 2.0 * phase - 1.0,
    }
}

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bipolar_to_unipolar() {
        assert!((bipolar_to_unipolar(-1.0) - 0.0).abs() < 1e-6);
        assert!((bipolar_to_unipolar(0.0) - 0.5).abs() < 1e-6);
        assert!((bipolar_to_unipolar(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shapes_at_quarter_phases() {
        let table = [
            (LfoShape::Sine, [0.0, 1.0, 0.0, -1.0]),
            (LfoShape::Saw, [-1.0, -0.5, 0.0, 0.5]),
        ];
        for (shape, expected) in table {
            for (i, want) in expected.iter().enumerate() {
                let got = shape_at(shape, i as f32 * 0.25);
                assert!((got - want).abs() < 1e-5, "{shape:?} at {i}/4: {got}");
            }
        }
    }

    #[test]
    fn test_one_cycle_per_period() {
        // 5 Hz at 48 kHz is 9600 samples per cycle
        let mut lfo = Lfo::saw();
        for _ in 0..9600 {
            lfo.next_sample(5.0, 48_000.0);
        }
        let phase = lfo.phase();
        assert!(phase < 1e-3 || phase > 1.0 - 1e-3, "phase {phase}");
    }

    #[test]
    fn test_output_stays_bipolar() {
        for shape in [LfoShape::Sine, LfoShape::Saw] {
            let mut lfo = Lfo::new(shape);
            for _ in 0..10_000 {
                let v = lfo.next_sample(440.0, 48_000.0);
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_set_phase_wraps() {
        let mut lfo = Lfo::sine();
        lfo.set_phase(1.25);
        assert!((lfo.phase() - 0.25).abs() < 1e-6);
        lfo.set_phase(-0.25);
        assert!((lfo.phase() - 0.75).abs() < 1e-6);
    }
}
