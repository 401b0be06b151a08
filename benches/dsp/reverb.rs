//! Benchmarks for the comb/allpass reverb network.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fxchain::dsp::reverb::{room_feedback, ReverbNetwork};

use crate::BLOCK_SIZES;

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    let sample_rate = 48_000.0;
    let rooms: &[(&str, f32, f32)] = &[
        ("small_room", 0.3, 0.5),
        ("large_room", 0.9, 0.3),
        ("high_damping", 0.5, 0.9),
    ];

    for &size in BLOCK_SIZES {
        // Short impulse followed by a quiet tail, interleaved stereo
        let input: Vec<f32> = (0..size * 2)
            .map(|i| {
                if i < 20 {
                    1.0 - (i as f32 / 20.0)
                } else {
                    (i as f32 * 0.05).sin() * 0.1
                }
            })
            .collect();

        for &(name, room_size, damping) in rooms {
            let mut network = ReverbNetwork::new(sample_rate, 2);
            network.set_feedback(room_feedback(room_size));
            network.set_damping(damping * 0.5);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for frame in input.chunks_exact(2) {
                        sum += network.process(0, black_box(frame[0]));
                        sum += network.process(1, black_box(frame[1]));
                    }
                    sum
                })
            });
        }
    }

    group.finish();
}
