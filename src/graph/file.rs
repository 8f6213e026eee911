use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use hound::WavReader;
use log::{debug, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    buffer::Buffer,
    error::{AudError, AudResult},
    graph::node::{frames_in, AudioFactory, AudioReader, Block},
    spec::{AudioSpec, Channels},
};

/*
File-Backed Sources
===================

A FileFactory decodes a RIFF/WAVE stream, either from a path or from bytes
already in memory.

Path-backed factories are lazy: nothing touches the filesystem until
create_reader(), and that is also where a missing or unreadable file is
reported (ResourceUnavailable). Each reader opens its own handle, so two
readers over the same file have independent positions.

Memory-backed factories copy the caller's bytes once at construction into a
shared Buffer; readers wrap that Buffer in a cursor, so creating a reader
never copies the data again and the caller's memory can be freed right away.

    open("kick.wav")        create_reader()          read()
        │                        │                     │
    (no I/O)              open + parse header      decode samples
                          ResourceUnavailable      Decode on corrupt data
                          Decode on bad header

Supported encodings are whatever the decoder backend accepts: 8/16/24/32-bit
integer PCM and 32-bit float. Integer samples are scaled to [-1, 1).
*/

/// Explicit settings for resolving file sources.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Directory that relative source paths are resolved against
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_dir: Option<PathBuf>,
}

impl SourceConfig {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone)]
enum Origin {
    Path(PathBuf),
    Memory(Buffer),
}

/// Decodes audio from a file path or an in-memory buffer.
#[derive(Debug, Clone)]
pub struct FileFactory {
    origin: Origin,
}

impl FileFactory {
    /// Lazily reference a file. No I/O happens until a reader is created.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            origin: Origin::Path(path.as_ref().to_path_buf()),
        }
    }

    /// Like [`open`](Self::open), resolving relative paths through `config`.
    pub fn with_config(path: impl AsRef<Path>, config: &SourceConfig) -> Self {
        Self {
            origin: Origin::Path(config.resolve(path.as_ref())),
        }
    }

    /// Copy `bytes` into a shared buffer owned by the factory.
    pub fn from_memory(bytes: &[u8]) -> Self {
        Self::from_buffer(Buffer::copy_from(bytes))
    }

    pub fn from_buffer(buffer: Buffer) -> Self {
        Self {
            origin: Origin::Memory(buffer),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Path(path) => Some(path),
            Origin::Memory(_) => None,
        }
    }

    fn open_stream(&self) -> AudResult<SourceStream> {
        match &self.origin {
            Origin::Path(path) => {
                let file = File::open(path).map_err(|source| AudError::ResourceUnavailable {
                    path: path.clone(),
                    source,
                })?;
                Ok(SourceStream::File(BufReader::new(file)))
            }
            Origin::Memory(buffer) => Ok(SourceStream::Memory(Cursor::new(buffer.clone()))),
        }
    }

    fn label(&self) -> String {
        match &self.origin {
            Origin::Path(path) => path.display().to_string(),
            Origin::Memory(buffer) => format!("<memory, {} bytes>", buffer.len()),
        }
    }
}

impl AudioFactory for FileFactory {
    type Reader = FileReader;

    fn create_reader(&self) -> AudResult<FileReader> {
        let stream = self.open_stream()?;
        let wav = WavReader::new(stream).map_err(|err| decode_error(&self.label(), err))?;
        FileReader::new(wav, self.label())
    }
}

/// Byte source behind a file reader.
enum SourceStream {
    File(BufReader<File>),
    Memory(Cursor<Buffer>),
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceStream::File(file) => file.read(buf),
            SourceStream::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for SourceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SourceStream::File(file) => file.seek(pos),
            SourceStream::Memory(cursor) => cursor.seek(pos),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Encoding {
    Float,
    /// Integer PCM with the scale that maps it into [-1, 1)
    Int(f32),
}

pub struct FileReader {
    wav: WavReader<SourceStream>,
    spec: AudioSpec,
    encoding: Encoding,
    length: u64,
    frame: u64,
    label: String,
}

impl FileReader {
    fn new(wav: WavReader<SourceStream>, label: String) -> AudResult<Self> {
        let header = wav.spec();
        let encoding = match (header.sample_format, header.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => Encoding::Float,
            (hound::SampleFormat::Int, bits @ 1..=32) => {
                Encoding::Int(1.0 / (1u64 << (bits - 1)) as f32)
            }
            (format, bits) => {
                return Err(AudError::Decode(format!(
                    "{label}: unsupported encoding {format:?} at {bits} bits"
                )))
            }
        };
        let spec = AudioSpec::float(header.sample_rate, Channels::new(header.channels));
        spec.validate()
            .map_err(|err| AudError::Decode(format!("{label}: {err}")))?;

        let length = wav.duration() as u64;
        debug!("file reader: {label}, {spec}, {length} frames, {encoding:?}");
        Ok(Self {
            wav,
            spec,
            encoding,
            length,
            frame: 0,
            label,
        })
    }
}

impl AudioReader for FileReader {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let channels = self.spec.channels.count();
        let wanted = frames_in(out, &self.spec)?;
        let frames = (wanted as u64).min(self.length - self.frame) as usize;
        let samples = &mut out[..frames * channels];

        let mut decoded = 0;
        match self.encoding {
            Encoding::Float => {
                for (slot, sample) in samples.iter_mut().zip(self.wav.samples::<f32>()) {
                    *slot = sample.map_err(|err| decode_error(&self.label, err))?;
                    decoded += 1;
                }
            }
            Encoding::Int(scale) => {
                for (slot, sample) in samples.iter_mut().zip(self.wav.samples::<i32>()) {
                    *slot = sample.map_err(|err| decode_error(&self.label, err))? as f32 * scale;
                    decoded += 1;
                }
            }
        }

        if decoded < samples.len() {
            warn!(
                "{}: data ended after {} of {} samples at frame {}",
                self.label,
                decoded,
                samples.len(),
                self.frame
            );
            return Err(AudError::Decode(format!(
                "{}: truncated sample data at frame {}",
                self.label, self.frame
            )));
        }

        self.frame += frames as u64;
        if self.frame == self.length {
            Ok(Block::last(frames))
        } else {
            Ok(Block::full(frames))
        }
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        let target = frame.min(self.length);
        debug!("file reader seek: {} -> frame {target}", self.label);
        self.wav
            .seek(target as u32)
            .map_err(|err| seek_error(&self.label, err))?;
        self.frame = target;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.frame
    }

    fn length(&self) -> Option<u64> {
        Some(self.length)
    }
}

fn decode_error(label: &str, err: hound::Error) -> AudError {
    AudError::Decode(format!("{label}: {err}"))
}

/// The stream is already open, so a failed seek means unreadable data.
fn seek_error(label: &str, err: io::Error) -> AudError {
    warn!("{label}: seek failed: {err}");
    AudError::Decode(format!("{label}: seek failed: {err}"))
}
