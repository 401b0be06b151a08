//! Benchmarks for complete effects, pulled the way a host pulls them.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use fxchain::effects::{Delay, EnhancedReverb, ShimmerReverb, Vocoder};
use fxchain::source::SineSource;
use fxchain::{AudioSource, StreamFormat};

use crate::BLOCK_SIZES;

fn bench_source<S: AudioSource>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    name: &str,
    size: usize,
    effect: &mut S,
) {
    let mut buffer = vec![0.0f32; size * 2];
    group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
        b.iter(|| black_box(effect.read(&mut buffer, 0, size * 2)))
    });
}

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("effects");
    let format = StreamFormat::stereo(48_000);

    for &size in BLOCK_SIZES {
        let tone = || SineSource::new(format, 220.0, 0.5);

        if let Ok(mut delay) = Delay::new(tone()) {
            bench_source(&mut group, "delay", size, &mut delay);
        }
        if let Ok(mut reverb) = EnhancedReverb::new(tone()) {
            bench_source(&mut group, "enhanced_reverb", size, &mut reverb);
        }
        if let Ok(mut shimmer) = ShimmerReverb::new(tone()) {
            bench_source(&mut group, "shimmer_reverb", size, &mut shimmer);
        }
        if let Ok(mut vocoder) = Vocoder::new(tone()) {
            bench_source(&mut group, "vocoder", size, &mut vocoder);
        }
    }

    group.finish();
}
