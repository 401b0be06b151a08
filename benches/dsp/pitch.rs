//! Benchmarks for the granular pitch shifter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fxchain::dsp::pitch::GrainPitchShifter;

use crate::BLOCK_SIZES;

pub fn bench_pitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/pitch");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();

        for &(name, semitones) in &[("octave_up", 12.0f32), ("fifth_down", -7.0)] {
            let mut shifter = GrainPitchShifter::with_grain_ms(50.0, 48_000.0);
            shifter.set_semitones(semitones);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    shifter.render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
