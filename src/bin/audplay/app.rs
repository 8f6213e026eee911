//! Audplay - playback and offline bounce of a built graph

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use color_eyre::eyre::{bail, eyre, Result as EyreResult, WrapErr};
use log::{info, warn};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use audspace::{
    graph::{AudioFactory, AudioReader, BoxedFactory, FactoryExt},
    io::{encode, pump},
    AudioSpec, Channels, DeviceSpec, SampleFormat, MAX_BLOCK_SIZE,
};

/// Frames buffered between the render thread and the device callback.
const RING_FRAMES: usize = 8 * MAX_BLOCK_SIZE;

pub struct Audplay {
    factory: BoxedFactory,
    rate: Option<u32>,
    channels: Option<u16>,
    format: Option<SampleFormat>,
    frames: Option<u64>,
}

impl Audplay {
    pub fn new(factory: BoxedFactory) -> Self {
        Self {
            factory,
            rate: None,
            channels: None,
            format: None,
            frames: None,
        }
    }

    pub fn rate(mut self, rate: Option<u32>) -> Self {
        self.rate = rate;
        self
    }

    pub fn channels(mut self, channels: Option<u16>) -> Self {
        self.channels = channels;
        self
    }

    pub fn format(mut self, format: Option<SampleFormat>) -> Self {
        self.format = format;
        self
    }

    /// Stop after this many output frames.
    pub fn frames(mut self, frames: Option<u64>) -> Self {
        self.frames = frames;
        self
    }

    /// Play through the default output device until the stream ends.
    pub fn play(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let device_rate = config.sample_rate().0;
        if let Some(rate) = self.rate.filter(|&rate| rate != device_rate) {
            warn!("device runs at {device_rate} Hz; ignoring requested rate {rate}");
        }
        let target = DeviceSpec::new(
            device_rate,
            Channels::new(config.channels()),
            SampleFormat::Float32,
        );

        let reader = self.factory.resample_sinc(target).create_reader()?;
        info!("playing {} on {}", reader.spec(), device.name().unwrap_or_default());

        let (mut consumer, handle) = pump::spawn(reader, RING_FRAMES)?;
        let channels = target.channels().count() as u64;
        let limit = self.frames.map(|frames| frames * channels);
        let played = Arc::new(AtomicU64::new(0));
        let drained = Arc::new(AtomicBool::new(false));

        let stream = device.build_output_stream(
            &config.into(),
            {
                let played = played.clone();
                let drained = drained.clone();
                move |data: &mut [f32], _| {
                    let taken = pump::drain_into(&mut consumer, data);
                    played.fetch_add(taken as u64, Ordering::Relaxed);
                    if taken == 0 && consumer.is_abandoned() {
                        drained.store(true, Ordering::Release);
                    }
                }
            },
            |err| warn!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        while !drained.load(Ordering::Acquire) {
            if limit.is_some_and(|limit| played.load(Ordering::Relaxed) >= limit) {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        drop(stream);

        handle.stop();
        let frames = handle.join()?;
        info!("played {} of {frames} rendered frames", played.load(Ordering::Relaxed) / channels);
        Ok(())
    }

    /// Render offline into a WAV file.
    pub fn bounce(self, path: &Path) -> EyreResult<()> {
        let format = self.format.unwrap_or(SampleFormat::S16);
        let mut reader = self.factory.create_reader()?;
        let source = reader.spec();

        let target = AudioSpec::new(
            self.rate.unwrap_or(source.rate),
            self.channels.map(Channels::new).unwrap_or(source.channels),
            format,
        );
        if target.rate != source.rate || target.channels != source.channels {
            drop(reader);
            reader = Box::new(
                self.factory
                    .resample_sinc(DeviceSpec::from(target))
                    .create_reader()?,
            );
        }

        let max_frames = match (self.frames, reader.length()) {
            (Some(frames), _) => frames,
            (None, Some(length)) => length,
            (None, None) => bail!("the graph never ends; pass --frames to bounce it"),
        };

        let wav_spec = wav_spec(&target)?;
        let mut writer = hound::WavWriter::create(path, wav_spec)
            .wrap_err_with(|| format!("cannot create {}", path.display()))?;

        let channels = target.channels.count();
        let mut block = vec![0.0f32; MAX_BLOCK_SIZE * channels];
        let mut written = 0u64;
        while written < max_frames {
            let want = (max_frames - written).min(MAX_BLOCK_SIZE as u64) as usize;
            let status = reader.read(&mut block[..want * channels])?;
            for &sample in &block[..status.frames * channels] {
                write_sample(&mut writer, format, sample)?;
            }
            written += status.frames as u64;
            if status.end_of_stream {
                break;
            }
        }
        writer.finalize()?;

        info!("bounced {written} frames ({target}) to {}", path.display());
        Ok(())
    }
}

fn wav_spec(spec: &AudioSpec) -> EyreResult<hound::WavSpec> {
    let (bits_per_sample, sample_format) = match spec.format {
        SampleFormat::U8 => (8, hound::SampleFormat::Int),
        SampleFormat::S16 => (16, hound::SampleFormat::Int),
        SampleFormat::S24 => (24, hound::SampleFormat::Int),
        SampleFormat::S32 => (32, hound::SampleFormat::Int),
        SampleFormat::Float32 => (32, hound::SampleFormat::Float),
        SampleFormat::Float64 => bail!("WAV bounce supports at most 32-bit float"),
    };
    Ok(hound::WavSpec {
        channels: spec.channels.count() as u16,
        sample_rate: spec.rate,
        bits_per_sample,
        sample_format,
    })
}

fn write_sample<W: std::io::Write + std::io::Seek>(
    writer: &mut hound::WavWriter<W>,
    format: SampleFormat,
    sample: f32,
) -> Result<(), hound::Error> {
    match format {
        SampleFormat::U8 => writer.write_sample(encode::quantize(sample, format) as i8),
        SampleFormat::S16 => writer.write_sample(encode::quantize(sample, format) as i16),
        SampleFormat::S24 | SampleFormat::S32 => {
            writer.write_sample(encode::quantize(sample, format))
        }
        SampleFormat::Float32 | SampleFormat::Float64 => writer.write_sample(sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bounce_samples_match_device_encoding() {
        let samples = [-1.5f32, -0.25, 0.0, 0.5, 1.0, f32::NAN];
        let spec = wav_spec(&AudioSpec::new(8_000, Channels::MONO, SampleFormat::S16)).unwrap();

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in &samples {
            write_sample(&mut writer, SampleFormat::S16, s).unwrap();
        }
        writer.finalize().unwrap();

        cursor.set_position(0);
        let decoded: Vec<i16> = hound::WavReader::new(cursor)
            .unwrap()
            .samples::<i16>()
            .map(Result::unwrap)
            .collect();

        let mut expected = Vec::new();
        encode::encode_interleaved(&samples, SampleFormat::S16, &mut expected);
        let expected: Vec<i16> = expected
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn float64_bounce_is_rejected() {
        let spec = AudioSpec::new(8_000, Channels::MONO, SampleFormat::Float64);
        assert!(wav_spec(&spec).is_err());
    }
}
