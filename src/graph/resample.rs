use log::debug;

use crate::{
    dsp::{
        channels::remap_block,
        resample::{lerp, RateClock, SincResampler},
    },
    error::AudResult,
    graph::node::{frames_in, AudioFactory, AudioReader, Block},
    spec::{AudioSpec, Channels, DeviceSpec},
    MAX_BLOCK_SIZE,
};

/*
Mixer Factories (Resampling)
============================

A mixer factory converts its child's stream to a target device spec: first
the channel layout, then the sample rate. Output frame k sits at input
position k · in_rate / out_rate (see `dsp::resample::RateClock`), so a stream
of L input frames yields exactly ceil(L · out_rate / in_rate) output frames,
and `length()` always matches what the reader delivers.

The interpolation state, any partly consumed input block and (for sinc) the
resampled frames not yet handed out all live in the reader and persist
across read() calls. Reading 1000 frames in one call or in 1000 one-frame
calls gives identical output, which is what keeps chunk boundaries free of
clicks.

Linear    cheap, exact on constant input, mild aliasing when downsampling
Sinc      rubato windowed sinc, cutoff lowered when downsampling; the
          stream edges are padded by repeating the first/last frame, so a
          constant input stays constant right up to both ends. Equal rates
          pass frames through untouched.

Example usage:
  let device = DeviceSpec::new(48_000, Channels::STEREO, SampleFormat::S16);
  let ready = FileFactory::open("take.wav").resample_sinc(device);
*/

/// Shared configuration of every mixer factory: a child and a target spec.
pub struct MixerFactory<F> {
    input: F,
    target: DeviceSpec,
}

impl<F> MixerFactory<F> {
    pub fn new(input: F, target: DeviceSpec) -> Self {
        Self { input, target }
    }

    pub fn target(&self) -> DeviceSpec {
        self.target
    }
}

impl<F: AudioFactory> MixerFactory<F> {
    /// Child reader converted to the target channel layout.
    fn mapped_reader(&self) -> AudResult<ChannelMapReader<F::Reader>> {
        self.target.validate()?;
        let input = self.input.create_reader()?;
        ChannelMapReader::new(input, self.target.channels())
    }
}

/// Converts the channel layout of its input.
pub struct ChannelMapReader<R> {
    input: R,
    spec: AudioSpec,
    scratch: Vec<f32>,
}

impl<R: AudioReader> ChannelMapReader<R> {
    pub fn new(input: R, channels: Channels) -> AudResult<Self> {
        let source = input.spec();
        source.validate()?;
        let spec = AudioSpec::float(source.rate, channels);
        spec.validate()?;
        Ok(Self {
            scratch: vec![0.0; MAX_BLOCK_SIZE * source.channels.count()],
            input,
            spec,
        })
    }
}

impl<R: AudioReader> AudioReader for ChannelMapReader<R> {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let in_channels = self.input.spec().channels.count();
        let out_channels = self.spec.channels.count();
        if in_channels == out_channels {
            return self.input.read(out);
        }

        let wanted = frames_in(out, &self.spec)?;
        let mut done = 0;
        while done < wanted {
            let chunk = (wanted - done).min(MAX_BLOCK_SIZE);
            let block = self.input.read(&mut self.scratch[..chunk * in_channels])?;
            remap_block(
                &self.scratch[..block.frames * in_channels],
                in_channels,
                &mut out[done * out_channels..(done + block.frames) * out_channels],
                out_channels,
            );
            done += block.frames;
            if block.end_of_stream {
                return Ok(Block::last(done));
            }
        }
        Ok(Block::full(done))
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        self.input.seek(frame)
    }

    fn position(&self) -> u64 {
        self.input.position()
    }

    fn length(&self) -> Option<u64> {
        self.input.length()
    }
}

/// Hands out single input frames from block-sized reads.
struct FrameSource<R> {
    input: R,
    channels: usize,
    chunk: Vec<f32>,
    pos: usize,
    len: usize,
    eos: bool,
    /// Absolute index of the frame `next_frame` returns next
    next: u64,
}

impl<R: AudioReader> FrameSource<R> {
    fn new(input: R) -> Self {
        let channels = input.spec().channels.count();
        Self {
            next: input.position(),
            input,
            channels,
            chunk: vec![0.0; MAX_BLOCK_SIZE * channels],
            pos: 0,
            len: 0,
            eos: false,
        }
    }

    /// Copy the next frame into `dst`. Returns false at end of stream.
    fn next_frame(&mut self, dst: &mut [f32]) -> AudResult<bool> {
        if self.pos == self.len {
            if self.eos {
                return Ok(false);
            }
            let block = self.input.read(&mut self.chunk)?;
            self.pos = 0;
            self.len = block.frames;
            self.eos = block.end_of_stream;
            if self.len == 0 {
                self.eos = true;
                return Ok(false);
            }
        }
        let start = self.pos * self.channels;
        dst.copy_from_slice(&self.chunk[start..start + self.channels]);
        self.pos += 1;
        self.next += 1;
        Ok(true)
    }

    /// Position the source on `frame`, skipping the child seek when it is
    /// already there.
    fn seek(&mut self, frame: u64) -> AudResult<()> {
        if frame == self.next {
            return Ok(());
        }
        self.input.seek(frame)?;
        self.pos = 0;
        self.len = 0;
        self.eos = false;
        self.next = frame;
        Ok(())
    }
}

/// Resamples its input with linear interpolation.
pub struct LinearResampleFactory<F> {
    mixer: MixerFactory<F>,
}

impl<F> LinearResampleFactory<F> {
    pub fn new(input: F, target: DeviceSpec) -> Self {
        Self {
            mixer: MixerFactory::new(input, target),
        }
    }
}

impl<F: AudioFactory> AudioFactory for LinearResampleFactory<F> {
    type Reader = LinearResampleReader<ChannelMapReader<F::Reader>>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let input = self.mixer.mapped_reader()?;
        Ok(LinearResampleReader::new(input, self.mixer.target().rate()))
    }
}

pub struct LinearResampleReader<R> {
    source: FrameSource<R>,
    spec: AudioSpec,
    clock: RateClock,
    prev: Vec<f32>,
    next: Vec<f32>,
    /// Input index of `prev`
    base: u64,
    /// `next` holds a real input frame rather than a held copy of `prev`
    has_next: bool,
    started: bool,
    done: bool,
    position: u64,
}

impl<R: AudioReader> LinearResampleReader<R> {
    pub fn new(input: R, rate: u32) -> Self {
        let source_spec = input.spec();
        let channels = source_spec.channels.count();
        debug!(
            "linear resample reader: {} Hz -> {} Hz, {} ch",
            source_spec.rate, rate, channels
        );
        Self {
            source: FrameSource::new(input),
            spec: AudioSpec::float(rate, source_spec.channels),
            clock: RateClock::new(source_spec.rate, rate),
            prev: vec![0.0; channels],
            next: vec![0.0; channels],
            base: 0,
            has_next: false,
            started: false,
            done: false,
            position: 0,
        }
    }

    fn prime(&mut self) -> AudResult<()> {
        self.started = true;
        let (input_frame, _) = self.clock.input_position(self.position);
        self.source.seek(input_frame)?;
        self.base = input_frame;
        if !self.source.next_frame(&mut self.prev)? {
            self.done = true;
            return Ok(());
        }
        self.pull_next()
    }

    fn pull_next(&mut self) -> AudResult<()> {
        self.has_next = self.source.next_frame(&mut self.next)?;
        if !self.has_next {
            self.next.copy_from_slice(&self.prev);
        }
        Ok(())
    }

    /// Move the interpolation pair forward until `prev` is input frame
    /// `target`. Returns false when the input ends first.
    fn advance_to(&mut self, target: u64) -> AudResult<bool> {
        while self.base < target {
            if !self.has_next {
                return Ok(false);
            }
            std::mem::swap(&mut self.prev, &mut self.next);
            self.pull_next()?;
            self.base += 1;
        }
        Ok(true)
    }
}

impl<R: AudioReader> AudioReader for LinearResampleReader<R> {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let wanted = frames_in(out, &self.spec)?;
        let channels = self.spec.channels.count();
        if !self.started {
            self.prime()?;
        }

        let mut frames = 0;
        while frames < wanted && !self.done {
            let (input_frame, frac) = self.clock.input_position(self.position);
            if !self.advance_to(input_frame)? {
                self.done = true;
                break;
            }

            let frame = &mut out[frames * channels..(frames + 1) * channels];
            for ((o, &a), &b) in frame.iter_mut().zip(&self.prev).zip(&self.next) {
                *o = lerp(a, b, frac);
            }
            frames += 1;
            self.position += 1;

            // Report the end together with the last frame.
            let (following, _) = self.clock.input_position(self.position);
            if following > self.base && !self.has_next {
                self.done = true;
            }
        }

        if self.done {
            Ok(Block::last(frames))
        } else {
            Ok(Block::full(frames))
        }
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        debug!("linear resample seek: output {frame}");
        self.position = frame;
        self.started = false;
        self.done = false;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn length(&self) -> Option<u64> {
        Some(self.clock.output_length(self.source.input.length()?))
    }
}

/// Resamples its input with band-limited (windowed-sinc) interpolation.
pub struct SincResampleFactory<F> {
    mixer: MixerFactory<F>,
    sinc_len: usize,
}

impl<F> SincResampleFactory<F> {
    pub fn new(input: F, target: DeviceSpec) -> Self {
        Self::with_sinc_len(input, target, SincResampler::DEFAULT_SINC_LEN)
    }

    /// `sinc_len` is the filter length in taps, rounded up to a multiple of 8.
    pub fn with_sinc_len(input: F, target: DeviceSpec, sinc_len: usize) -> Self {
        Self {
            mixer: MixerFactory::new(input, target),
            sinc_len,
        }
    }
}

impl<F: AudioFactory> AudioFactory for SincResampleFactory<F> {
    type Reader = SincResampleReader<ChannelMapReader<F::Reader>>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let input = self.mixer.mapped_reader()?;
        SincResampleReader::new(input, self.mixer.target().rate(), self.sinc_len)
    }
}

pub struct SincResampleReader<R> {
    source: FrameSource<R>,
    spec: AudioSpec,
    clock: RateClock,
    /// `None` when the rates already match
    resampler: Option<SincResampler>,
    /// Planar chunk handed to the resampler
    input: Vec<Vec<f32>>,
    output: Vec<Vec<f32>>,
    /// Interleaved frames resampled but not yet read
    pending: Vec<f32>,
    pending_pos: usize,
    /// Most recent real input frame, repeated past the end of the stream
    last: Vec<f32>,
    /// `last` was read but not yet fed to the resampler
    held: bool,
    /// Copies of the first frame still to feed
    lead: u64,
    /// Resampled frames still to drop
    skip: u64,
    /// Input frame the current run started from
    origin: u64,
    fed: u64,
    /// Output frame count, once the input has ended
    limit: Option<u64>,
    started: bool,
    position: u64,
}

impl<R: AudioReader> SincResampleReader<R> {
    pub fn new(input: R, rate: u32, sinc_len: usize) -> AudResult<Self> {
        let source_spec = input.spec();
        let channels = source_spec.channels.count();
        let clock = RateClock::new(source_spec.rate, rate);
        let resampler = if clock.is_identity() {
            None
        } else {
            Some(SincResampler::new(clock, sinc_len, channels)?)
        };
        debug!(
            "sinc resample reader: {} Hz -> {} Hz, {} ch, {} taps",
            source_spec.rate,
            rate,
            channels,
            resampler.as_ref().map_or(0, SincResampler::sinc_len)
        );

        let (chunk, max_out) = resampler
            .as_ref()
            .map_or((0, 0), |r| (r.input_frames(), r.output_frames_max()));
        Ok(Self {
            source: FrameSource::new(input),
            spec: AudioSpec::float(rate, source_spec.channels),
            clock,
            resampler,
            input: vec![vec![0.0; chunk]; channels],
            output: vec![vec![0.0; max_out]; channels],
            pending: Vec::with_capacity(max_out * channels),
            pending_pos: 0,
            last: vec![0.0; channels],
            held: false,
            lead: 0,
            skip: 0,
            origin: 0,
            fed: 0,
            limit: None,
            started: false,
            position: 0,
        })
    }

    /// Start a fresh run producing output frame `frame` next.
    fn restart(&mut self, frame: u64) -> AudResult<()> {
        self.started = true;
        self.position = frame;
        self.pending.clear();
        self.pending_pos = 0;
        self.held = false;
        self.fed = 0;
        self.limit = None;

        let Some(resampler) = self.resampler.as_mut() else {
            self.origin = frame;
            return self.source.seek(frame);
        };

        // Restart on an input frame that lands exactly on an output frame,
        // far enough back that the filter sees real signal around `frame`.
        let (input_frame, _) = self.clock.input_position(frame);
        let step = self.clock.alignment();
        let origin = input_frame.saturating_sub(resampler.context_frames()) / step * step;
        resampler.reset();
        self.origin = origin;
        self.lead = resampler.lead_frames();
        self.skip = resampler.startup_skip() + (frame - self.clock.output_length(origin));

        self.source.seek(origin)?;
        if self.source.next_frame(&mut self.last)? {
            self.held = true;
        } else {
            self.end_input();
        }
        Ok(())
    }

    fn end_input(&mut self) {
        self.limit
            .get_or_insert(self.clock.output_length(self.origin + self.fed));
    }

    /// Feed one chunk to the resampler and queue what comes out.
    fn produce(&mut self) -> AudResult<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };

        for i in 0..resampler.input_frames() {
            if self.lead > 0 {
                self.lead -= 1;
            } else if self.held {
                self.held = false;
                self.fed += 1;
            } else if self.limit.is_none() {
                if self.source.next_frame(&mut self.last)? {
                    self.fed += 1;
                } else {
                    self.limit = Some(self.clock.output_length(self.origin + self.fed));
                }
            }
            for (buf, &sample) in self.input.iter_mut().zip(&self.last) {
                buf[i] = sample;
            }
        }

        let written = resampler.process(&self.input, &mut self.output)?;
        let dropped = (self.skip.min(written as u64)) as usize;
        self.skip -= dropped as u64;

        self.pending.drain(..self.pending_pos);
        self.pending_pos = 0;
        for i in dropped..written {
            self.pending.extend(self.output.iter().map(|buf| buf[i]));
        }
        Ok(())
    }

    fn finished(&self) -> bool {
        self.limit.is_some_and(|limit| self.position >= limit)
    }
}

impl<R: AudioReader> AudioReader for SincResampleReader<R> {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let wanted = frames_in(out, &self.spec)?;
        let channels = self.spec.channels.count();
        if !self.started {
            self.restart(self.position)?;
        }

        let mut frames = 0;
        while frames < wanted && !self.finished() {
            if self.resampler.is_none() {
                let dst = &mut out[frames * channels..(frames + 1) * channels];
                if self.source.next_frame(dst)? {
                    self.fed += 1;
                    self.position += 1;
                    frames += 1;
                } else {
                    self.end_input();
                }
                continue;
            }

            if self.pending_pos == self.pending.len() {
                self.produce()?;
                continue;
            }

            let available = (self.pending.len() - self.pending_pos) / channels;
            let mut take = available.min(wanted - frames);
            if let Some(limit) = self.limit {
                take = take.min((limit - self.position) as usize);
            }
            let samples = take * channels;
            out[frames * channels..frames * channels + samples]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + samples]);
            self.pending_pos += samples;
            self.position += take as u64;
            frames += take;
        }

        if self.finished() {
            Ok(Block::last(frames))
        } else {
            Ok(Block::full(frames))
        }
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        debug!("sinc resample seek: output {frame}");
        self.restart(frame)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn length(&self) -> Option<u64> {
        Some(self.clock.output_length(self.source.input.length()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        graph::{
            extensions::FactoryExt,
            node::{read_to_end, testing::*, BoxedFactory},
            sinus::SinusFactory,
        },
        spec::SampleFormat,
    };

    fn device(rate: u32, channels: Channels) -> DeviceSpec {
        DeviceSpec::new(rate, channels, SampleFormat::Float32)
    }

    /// Read `factory` in uneven chunks to exercise state carried across calls.
    fn collect_chunked<F: AudioFactory>(factory: &F, chunks: &[usize]) -> Vec<f32> {
        let mut reader = factory.create_reader().unwrap();
        let channels = reader.spec().channels.count();
        let mut samples = Vec::new();
        let mut buf = vec![0.0; 4_096 * channels];
        for &chunk in chunks.iter().cycle() {
            let block = reader.read(&mut buf[..chunk * channels]).unwrap();
            samples.extend_from_slice(&buf[..block.frames * channels]);
            if block.end_of_stream {
                break;
            }
        }
        samples
    }

    #[test]
    fn linear_constant_input_stays_constant() {
        let source = VecFactory::mono(&[0.25; 10_000]);
        let resampled = source.resample_linear(device(48_000, Channels::MONO));
        let out = collect_chunked(&resampled, &[1, 7, 512, 33]);

        assert!(!out.is_empty());
        assert!(out.iter().all(|&s| s == 0.25), "linear output drifted from DC");
    }

    #[test]
    fn sinc_constant_input_stays_constant() {
        let source = VecFactory::mono(&[0.25; 10_000]);
        for rate in [22_050, 32_000, 96_000] {
            let resampled = source.clone().resample_sinc(device(rate, Channels::MONO));
            let out = collect_chunked(&resampled, &[3, 256, 1, 1000]);

            assert!(!out.is_empty());
            for (i, &s) in out.iter().enumerate() {
                assert!((s - 0.25).abs() < 1e-3, "rate {rate}, frame {i}: {s}");
            }
        }
    }

    #[test]
    fn duration_is_preserved() {
        let source = VecFactory::mono(&[0.0; 44_100]);
        for rate in [8_000, 22_050, 48_000, 96_000] {
            let linear = collect(&source.clone().resample_linear(device(rate, Channels::MONO)));
            let sinc = collect(&source.clone().resample_sinc(device(rate, Channels::MONO)));

            assert_eq!(linear.len(), rate as usize, "linear {rate}");
            assert_eq!(sinc.len(), rate as usize, "sinc {rate}");
        }
    }

    #[test]
    fn length_matches_delivered_frames() {
        for frames in [1, 2, 147, 441, 442, 1_000, 4_410] {
            for (rate, target) in [(44_100, 48_000), (48_000, 44_100), (22_050, 32_000)] {
                let input =
                    VecFactory::with_spec(AudioSpec::float(rate, Channels::MONO), &vec![0.1; frames]);
                for resampled in [
                    BoxedFactory::new(input.clone().resample_linear(device(target, Channels::MONO))),
                    BoxedFactory::new(input.clone().resample_sinc(device(target, Channels::MONO))),
                ] {
                    let expected = resampled.create_reader().unwrap().length().unwrap();
                    assert_eq!(
                        collect(&resampled).len() as u64,
                        expected,
                        "{frames} frames, {rate} -> {target}"
                    );
                }
            }
        }
    }

    #[test]
    fn double_seek_past_resampled_first_child() {
        let first = VecFactory::with_spec(AudioSpec::float(44_100, Channels::MONO), &[0.0; 441]);
        let second: Vec<f32> = (1..=10).map(|i| i as f32).collect();
        let second = VecFactory::with_spec(AudioSpec::float(48_000, Channels::MONO), &second);
        let joined = first
            .resample_linear(device(48_000, Channels::MONO))
            .then(second);

        let all = collect(&joined);
        assert_eq!(all.len(), 480 + 10);
        assert_eq!(all[480], 1.0);

        let mut reader = joined.create_reader().unwrap();
        reader.seek(481).unwrap();
        let mut out = [0.0f32; 1];
        reader.read(&mut out).unwrap();
        assert_eq!(out[0], all[481]);
    }

    #[test]
    fn chunking_does_not_change_output() {
        let tone = SinusFactory::new(1_000.0, 44_100);
        let source = VecFactory::mono(&collect_first(&tone, 4_000));

        for resampled in [
            BoxedFactory::new(source.clone().resample_linear(device(48_000, Channels::MONO))),
            BoxedFactory::new(source.clone().resample_sinc(device(48_000, Channels::MONO))),
        ] {
            let whole = collect_chunked(&resampled, &[4_096]);
            let pieces = collect_chunked(&resampled, &[1, 2, 3, 5, 8, 13, 21]);
            assert_eq!(whole, pieces);
        }
    }

    #[test]
    fn equal_rates_pass_through() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let source = VecFactory::mono(&samples);
        assert_eq!(collect(&source.clone().resample_linear(device(44_100, Channels::MONO))), samples);

        assert_eq!(collect(&source.resample_sinc(device(44_100, Channels::MONO))), samples);
    }

    #[test]
    fn mono_is_spread_to_stereo() {
        let source = VecFactory::mono(&[0.5, -0.5]);
        let out = collect(&source.resample_linear(device(44_100, Channels::STEREO)));
        assert_eq!(out, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn tone_survives_upsampling() {
        let tone = SinusFactory::new(100.0, 22_050).resample_sinc(device(44_100, Channels::MONO));
        let mut reader = tone.create_reader().unwrap();
        reader.seek(10_000).unwrap();
        let mut out = [0.0f32; 64];
        reader.read(&mut out).unwrap();
        assert_eq!(reader.position(), 10_064);

        for (i, &s) in out.iter().enumerate() {
            let n = 10_000 + i as u64;
            let expected = (std::f64::consts::TAU * 100.0 * n as f64 / 44_100.0).sin() as f32;
            assert!((s - expected).abs() < 2e-2, "frame {n}: {s} vs {expected}");
        }
    }

    #[test]
    fn seek_lands_on_same_samples_as_sequential_read() {
        let samples: Vec<f32> = (0..2_000).map(|i| (i as f32 * 0.01).sin()).collect();
        let source = VecFactory::mono(&samples);

        for (resampled, tolerance) in [
            (BoxedFactory::new(source.clone().resample_linear(device(32_000, Channels::MONO))), 1e-6),
            (BoxedFactory::new(source.clone().resample_sinc(device(32_000, Channels::MONO))), 1e-4),
        ] {
            let all = collect(&resampled);
            let mut reader = resampled.create_reader().unwrap();
            reader.seek(500).unwrap();
            let rest = read_to_end(&mut reader, usize::MAX).unwrap();

            assert_eq!(reader.position() as usize, all.len());
            assert_eq!(rest.len(), all.len() - 500);
            for (a, b) in rest.iter().zip(&all[500..]) {
                assert!((a - b).abs() < tolerance, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn zero_target_rate_is_a_configuration_error() {
        let resampled = VecFactory::mono(&[0.0]).resample_linear(device(0, Channels::MONO));
        let err = resampled.create_reader().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn empty_input_ends_immediately() {
        let resampled = VecFactory::mono(&[]).resample_sinc(device(48_000, Channels::MONO));
        let mut reader = resampled.create_reader().unwrap();
        let mut out = [0.0; 16];
        assert_eq!(reader.read(&mut out).unwrap(), Block::last(0));
    }

    fn collect_first<F: AudioFactory>(factory: &F, frames: usize) -> Vec<f32> {
        let mut reader = factory.create_reader().unwrap();
        read_to_end(&mut reader, frames).unwrap()
    }
}
