/*
Circular Delay Buffer
=====================

A fixed-capacity ring of samples with one write cursor. Every time-based
effect (echo, flanger, comb and allpass filters, pre-delay) is built on it.

  write(x)           store x at the cursor, advance the cursor
  read(d)            the sample written d steps before the most recent write
  read_interpolated  the same for fractional d, linearly interpolated

Delay 0 is the most recent write, delay capacity-1 the oldest sample still
held. Requests outside that window are clamped, so a read can never fault or
return garbage; callers size the capacity to the longest delay they need.

  capacity 8, after writing a b c d e:

    index   0   1   2   3   4   5   6   7
           [a] [b] [c] [d] [e] [ ] [ ] [ ]
                            ↑   ↑
                    most recent  write cursor

    read(0) = e, read(1) = d, read(4) = a

Fractional Delay
----------------

Modulated effects (flanger, chorus) sweep the delay smoothly, which needs
delays between integer samples:

    read_interpolated(2.25) = read(2) + (read(3) - read(2)) × 0.25

Linear interpolation slightly softens the highs, which is inaudible at the
short delays these effects use.
*/

#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line holding `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Store a sample and advance the write cursor.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Sample written `delay_samples` steps before the most recent write.
    #[inline]
    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.min(len - 1);
        // write_pos - 1 is the most recent write
        let index = (self.write_pos + len - 1 - delay) % len;
        self.buffer[index]
    }

    /// Fractional read, linearly interpolating the two nearest integer delays.
    #[inline]
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let max_delay = (self.buffer.len() - 1) as f32;
        let delay = if delay_samples.is_finite() {
            delay_samples.clamp(0.0, max_delay)
        } else {
            0.0
        };

        let whole = delay.floor();
        let frac = delay - whole;
        let index = whole as usize;

        let a = self.read(index);
        if frac == 0.0 {
            return a;
        }
        let b = self.read(index + 1);
        a + (b - a) * frac
    }

    /// Write `sample`, then return the sample `delay_samples` back.
    ///
    /// A delay of 0 returns `sample` itself.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        self.write(sample);
        self.read(delay_samples)
    }

    pub fn render(&mut self, buffer: &mut [f32], delay_samples: usize) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, delay_samples);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_returns_sample_from_d_writes_ago() {
        let mut line = DelayLine::with_capacity(16);
        for i in 0..40 {
            line.write(i as f32);
        }

        // Most recent write was 39
        for d in 0..16 {
            assert_eq!(line.read(d), (39 - d) as f32, "delay {d}");
        }
    }

    #[test]
    fn test_read_clamps_to_capacity() {
        let mut line = DelayLine::with_capacity(4);
        for i in 0..4 {
            line.write(i as f32);
        }

        assert_eq!(line.read(3), 0.0);
        assert_eq!(line.read(100), 0.0);
    }

    #[test]
    fn test_interpolated_matches_exact_at_integers() {
        let mut line = DelayLine::with_capacity(32);
        for i in 0..50 {
            line.write((i as f32 * 0.37).sin());
        }

        for d in 0..32 {
            assert_eq!(line.read_interpolated(d as f32), line.read(d));
        }
    }

    #[test]
    fn test_interpolated_blends_neighbours() {
        let mut line = DelayLine::with_capacity(8);
        line.write(0.0);
        line.write(1.0);

        // read(0) = 1.0, read(1) = 0.0
        assert!((line.read_interpolated(0.25) - 0.75).abs() < 1e-6);
        assert!((line.read_interpolated(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_interpolated_clamps_and_survives_non_finite() {
        let mut line = DelayLine::with_capacity(4);
        for i in 1..=4 {
            line.write(i as f32);
        }

        assert_eq!(line.read_interpolated(-3.0), 4.0);
        assert_eq!(line.read_interpolated(99.0), 1.0);
        assert_eq!(line.read_interpolated(f32::NAN), 4.0);
        assert_eq!(line.read_interpolated(f32::INFINITY), 4.0);
    }

    #[test]
    fn test_render_delays_buffer() {
        let mut line = DelayLine::with_capacity(8);
        let mut buffer = [1.0, 2.0, 3.0, 4.0, 5.0];

        line.render(&mut buffer, 2);

        assert_eq!(buffer, [0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_capacity_is_promoted() {
        let mut line = DelayLine::with_capacity(0);
        line.write(0.5);
        assert_eq!(line.capacity(), 1);
        assert_eq!(line.read(0), 0.5);
    }
}
