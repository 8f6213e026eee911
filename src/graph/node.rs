use crate::{
    error::{AudError, AudResult},
    spec::AudioSpec,
};

/// Outcome of one [`AudioReader::read`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Frames written to the front of the output buffer
    pub frames: usize,
    /// The stream has no more data after these frames
    pub end_of_stream: bool,
}

impl Block {
    pub const fn full(frames: usize) -> Self {
        Self {
            frames,
            end_of_stream: false,
        }
    }

    pub const fn last(frames: usize) -> Self {
        Self {
            frames,
            end_of_stream: true,
        }
    }
}

/// Stateful playback cursor over a PCM stream
///
/// Readers are created on demand by an [`AudioFactory`] and carry all mutable
/// playback state (position, filter history, interpolation phase). A reader
/// is driven by one thread at a time.
pub trait AudioReader: Send {
    /// Shape of the frames this reader produces. Always interleaved `f32`.
    fn spec(&self) -> AudioSpec;

    /// Fill `out` with interleaved frames.
    ///
    /// `out.len()` must be a multiple of the channel count. Fewer frames than
    /// requested are returned only at the end of the stream.
    fn read(&mut self, out: &mut [f32]) -> AudResult<Block>;

    /// Move the cursor to an absolute frame index.
    fn seek(&mut self, frame: u64) -> AudResult<()>;

    /// Frames delivered since the start of the stream (or the last seek).
    fn position(&self) -> u64;

    /// Total frames in the stream, `None` when unknown or infinite.
    fn length(&self) -> Option<u64>;
}

/// Allow boxed readers to be used as readers (for dynamic dispatch)
impl AudioReader for Box<dyn AudioReader> {
    fn spec(&self) -> AudioSpec {
        (**self).spec()
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        (**self).read(out)
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        (**self).seek(frame)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn length(&self) -> Option<u64> {
        (**self).length()
    }
}

/// Immutable blueprint that produces independent readers
///
/// Calling [`create_reader`](AudioFactory::create_reader) never changes the
/// factory, may be repeated, and every reader it yields has its own state.
/// Failures from child factories propagate unchanged.
pub trait AudioFactory: Send + Sync {
    type Reader: AudioReader + 'static;

    fn create_reader(&self) -> AudResult<Self::Reader>;
}

impl<F: AudioFactory + ?Sized> AudioFactory for Box<F> {
    type Reader = F::Reader;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        (**self).create_reader()
    }
}

/// Object-safe factory that hands out boxed readers
pub type DynFactory = dyn AudioFactory<Reader = Box<dyn AudioReader>>;

/// Type-erased factory, used when graph shape is only known at runtime
pub struct BoxedFactory {
    inner: Box<DynFactory>,
}

struct Erase<F>(F);

impl<F: AudioFactory> AudioFactory for Erase<F> {
    type Reader = Box<dyn AudioReader>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        Ok(Box::new(self.0.create_reader()?))
    }
}

impl BoxedFactory {
    pub fn new<F: AudioFactory + 'static>(factory: F) -> Self {
        Self {
            inner: Box::new(Erase(factory)),
        }
    }
}

impl AudioFactory for BoxedFactory {
    type Reader = Box<dyn AudioReader>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        self.inner.create_reader()
    }
}

/// Number of whole frames in `out`, or a configuration error when the buffer
/// does not hold complete frames.
pub(crate) fn frames_in(out: &[f32], spec: &AudioSpec) -> AudResult<usize> {
    let channels = spec.channels.count();
    if channels == 0 || out.len() % channels != 0 {
        return Err(AudError::Configuration(format!(
            "read buffer of {} samples is not a whole number of {}-channel frames",
            out.len(),
            channels
        )));
    }
    Ok(out.len() / channels)
}

/// Read from `reader` until `out` is full or the stream ends.
///
/// Readers that may return short blocks mid-stream (none in this crate, but
/// external implementations may) are handled the same as ones that do not.
pub fn read_exact<R: AudioReader + ?Sized>(reader: &mut R, out: &mut [f32]) -> AudResult<Block> {
    let channels = reader.spec().channels.count();
    let total = frames_in(out, &reader.spec())?;
    let mut done = 0;
    while done < total {
        let block = reader.read(&mut out[done * channels..])?;
        done += block.frames;
        if block.end_of_stream {
            return Ok(Block::last(done));
        }
        if block.frames == 0 {
            break;
        }
    }
    Ok(Block::full(done))
}

/// Pull an entire (finite) stream into memory, at most `max_frames` frames.
pub fn read_to_end<R: AudioReader + ?Sized>(reader: &mut R, max_frames: usize) -> AudResult<Vec<f32>> {
    let channels = reader.spec().channels.count();
    let mut samples = Vec::new();
    let mut block = vec![0.0f32; crate::MAX_BLOCK_SIZE * channels];
    while samples.len() / channels.max(1) < max_frames {
        let want = (max_frames - samples.len() / channels.max(1)).min(crate::MAX_BLOCK_SIZE);
        let status = reader.read(&mut block[..want * channels])?;
        samples.extend_from_slice(&block[..status.frames * channels]);
        if status.end_of_stream {
            break;
        }
    }
    Ok(samples)
}
