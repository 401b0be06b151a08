//! Benchmarks for FFT convolution at a few response lengths.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fxchain::dsp::{ConvolutionEngine, ImpulseResponse};

use crate::BLOCK_SIZES;

pub fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/convolution");

    let responses: &[(&str, f32)] = &[
        ("ir_100ms", 0.1),
        ("ir_1s", 1.0),
        ("ir_3s", 3.0),
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size * 2).map(|i| (i as f32 * 0.03).sin()).collect();
        let mut output = vec![0.0f32; size * 2];

        for &(name, seconds) in responses {
            let ir = ImpulseResponse::synthetic(48_000, seconds, 2, 7);
            let Ok(mut engine) = ConvolutionEngine::new(&ir, 2) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    engine.process(black_box(&input), &mut output);
                    output[0]
                })
            });
        }
    }

    group.finish();
}
