//! Benchmarks for filter readers.

use std::hint::black_box;

use audspace::graph::{AudioFactory, AudioReader, FactoryExt, SinusFactory};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("readers/filter");
    let tone = || SinusFactory::new(440.0, 48_000);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        let mut reader = tone().volume(0.5).create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("volume", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });

        let mut reader = tone().lowpass(1_000.0, 0.707).create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("lowpass", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });

        let mut reader = tone().sum().create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("sum", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });

        let mut reader = tone().rectify().create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("rectify", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });
    }

    group.finish();
}
