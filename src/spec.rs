//! Stream shape descriptions: sample rate, channel layout and sample format.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{AudError, AudResult};

/// On-the-wire representation of a single sample.
///
/// Readers inside a graph always produce `f32`; the other formats only matter
/// at the output boundary (see [`crate::io::encode`]).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    U8,
    S16,
    S24,
    S32,
    #[default]
    Float32,
    Float64,
}

impl SampleFormat {
    /// Bytes occupied by one sample of this format.
    pub const fn size(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 => 3,
            SampleFormat::S32 | SampleFormat::Float32 => 4,
            SampleFormat::Float64 => 8,
        }
    }
}

/// Number of interleaved channels in a stream.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channels(u16);

impl Channels {
    pub const MONO: Channels = Channels(1);
    pub const STEREO: Channels = Channels(2);

    pub const fn new(count: u16) -> Self {
        Channels(count)
    }

    pub const fn count(self) -> usize {
        self.0 as usize
    }
}

/// Shape of a PCM stream
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioSpec {
    /// Frames per second (Hz)
    pub rate: u32,
    pub channels: Channels,
    #[cfg_attr(feature = "serde", serde(default))]
    pub format: SampleFormat,
}

impl AudioSpec {
    pub const fn new(rate: u32, channels: Channels, format: SampleFormat) -> Self {
        Self {
            rate,
            channels,
            format,
        }
    }

    /// Spec of a stream as it travels through the graph (interleaved `f32`).
    pub const fn float(rate: u32, channels: Channels) -> Self {
        Self::new(rate, channels, SampleFormat::Float32)
    }

    /// Reject specs no reader can produce or consume.
    pub fn validate(&self) -> AudResult<()> {
        if self.rate == 0 {
            return Err(AudError::Configuration("sample rate must be non-zero".into()));
        }
        if self.channels.count() == 0 {
            return Err(AudError::Configuration("channel count must be non-zero".into()));
        }
        Ok(())
    }

    /// Bytes per interleaved frame in this spec's format.
    pub fn frame_size(&self) -> usize {
        self.channels.count() * self.format.size()
    }

    /// Same rate and channels, graph-internal float format.
    pub fn as_float(&self) -> Self {
        Self::float(self.rate, self.channels)
    }
}

impl fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {:?}",
            self.rate,
            self.channels.count(),
            self.format
        )
    }
}

/// Target a stream must be converted to before it reaches a device or mixer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub spec: AudioSpec,
}

impl DeviceSpec {
    pub const fn new(rate: u32, channels: Channels, format: SampleFormat) -> Self {
        Self {
            spec: AudioSpec::new(rate, channels, format),
        }
    }

    pub fn validate(&self) -> AudResult<()> {
        self.spec.validate()
    }

    pub fn rate(&self) -> u32 {
        self.spec.rate
    }

    pub fn channels(&self) -> Channels {
        self.spec.channels
    }

    pub fn format(&self) -> SampleFormat {
        self.spec.format
    }
}

impl From<AudioSpec> for DeviceSpec {
    fn from(spec: AudioSpec) -> Self {
        Self { spec }
    }
}
