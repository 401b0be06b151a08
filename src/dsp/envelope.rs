/*
Envelope Follower
=================

Tracks the loudness contour of a signal: the rectified input smoothed by a
one-pole filter that rises quickly and falls slowly.

    level += (|x| - level) × attack    when |x| > level
    level += (|x| - level) × release   otherwise

Each coefficient comes from a time constant in milliseconds:

    coeff = 1 - exp(-1 / (time_ms × sample_rate / 1000))

so after `time_ms` the level has covered ~63% of the distance to its target.

Attack vs Release
-----------------

  short attack    transients come through; the vocoder's consonants stay crisp
  long release    the level hangs on between syllables instead of chattering

Release shorter than one cycle of the analysed signal makes the follower
ripple at that frequency, which the vocoder hears as buzz. Its default of
20 ms sits above the period of anything but the lowest band.

The follower is unipolar and never overshoots: the level always lies between
its previous value and the current rectified input.
*/

/// Smoothing coefficient for a time constant of `time_ms`.
#[inline]
pub fn time_coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = time_ms.max(0.0) * sample_rate / 1000.0;
    if samples <= 1.0 {
        1.0
    } else {
        1.0 - (-1.0 / samples).exp()
    }
}

#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    level: f32,
    attack: f32,
    release: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self {
            level: 0.0,
            attack: time_coefficient(attack_ms, sample_rate),
            release: time_coefficient(release_ms, sample_rate),
        }
    }

    pub fn set_attack(&mut self, attack_ms: f32, sample_rate: f32) {
        self.attack = time_coefficient(attack_ms, sample_rate);
    }

    pub fn set_release(&mut self, release_ms: f32, sample_rate: f32) {
        self.release = time_coefficient(release_ms, sample_rate);
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let target = input.abs();
        let coeff = if target > self.level {
            self.attack
        } else {
            self.release
        };
        self.level += (target - self.level) * coeff;
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}
