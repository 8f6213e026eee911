use std::{hint::black_box, io::Cursor};

use audspace::{
    graph::{AudioFactory, AudioReader, FactoryExt, FileFactory},
    Channels, DeviceSpec, SampleFormat,
};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

/// One second of a 16-bit stereo 44.1kHz tone, encoded as WAV in memory.
fn tone_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for i in 0..44_100 {
        let s = (i as f32 * 440.0 * std::f32::consts::TAU / 44_100.0).sin();
        let v = (s * 16_000.0) as i16;
        writer.write_sample(v).unwrap();
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

pub fn bench_playback(c: &mut Criterion) {
    let mut group = c.benchmark_group("chains/playback");
    let wav = tone_wav();
    let target = DeviceSpec::new(48_000, Channels::STEREO, SampleFormat::Float32);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size * 2];

        let factory = FileFactory::from_memory(&wav)
            .highpass(40.0, 0.707)
            .resample_sinc(target);
        let mut reader = factory.create_reader().unwrap();
        group.bench_with_input(BenchmarkId::new("file_highpass_sinc", size), &size, |b, _| {
            b.iter(|| {
                let block = reader.read(black_box(&mut buffer)).unwrap();
                if block.end_of_stream {
                    reader.seek(0).unwrap();
                }
            })
        });
    }

    group.finish();
}
