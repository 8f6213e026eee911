use std::hint::black_box;

use audspace::graph::{AudioFactory, AudioReader, SinusFactory};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_sinus(c: &mut Criterion) {
    let mut group = c.benchmark_group("readers/sinus");

    for &size in BLOCK_SIZES {
        let mut reader = SinusFactory::new(440.0, 48_000).create_reader().unwrap();
        let mut buffer = vec![0.0f32; size];
        group.bench_with_input(BenchmarkId::new("read", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });
    }

    // Seeking is closed-form, so the distance should not matter
    let mut reader = SinusFactory::new(440.0, 48_000).create_reader().unwrap();
    group.bench_function("seek_far", |b| {
        b.iter(|| reader.seek(black_box(48_000 * 3_600)).unwrap())
    });

    group.finish();
}
