//! Benchmarks for channel mapping and rate conversion.

use std::hint::black_box;

use audspace::{
    graph::{AudioFactory, AudioReader, FactoryExt, SinusFactory},
    Channels, DeviceSpec, SampleFormat,
};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("readers/resample");
    let target = DeviceSpec::new(48_000, Channels::STEREO, SampleFormat::Float32);
    let tone = || SinusFactory::new(440.0, 44_100);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size * 2];

        let mut reader = tone().resample_linear(target).create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("linear", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });

        let mut reader = tone().resample_sinc(target).create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("sinc", size), &size, |b, _| {
            b.iter(|| reader.read(black_box(&mut buffer)).unwrap())
        });
    }

    group.finish();
}
