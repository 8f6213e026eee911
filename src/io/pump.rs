use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info, warn};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::{
    error::{AudError, AudResult},
    graph::node::AudioReader,
    MAX_BLOCK_SIZE,
};

/*
Reader → Realtime Handoff
=========================

Readers may block (file I/O) and allocate on creation, so they do not belong
in an audio callback. The pump moves one reader onto a render thread that
pulls blocks and pushes interleaved samples into a lock-free SPSC ring. The
callback only pops.

  [render thread]                          [audio callback]
  reader.read(block) ──→ Producer ══ring══ Consumer ──→ device buffer
                                                        (silence on underrun)

The reader stays on the render thread for its whole life, so it is never
touched by two threads. Dropping the PumpHandle stops the thread and releases
the reader.
*/

/// How long the render thread waits when the ring is full.
const FULL_BACKOFF: Duration = Duration::from_millis(2);

/// Controls a running pump thread.
pub struct PumpHandle {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<AudResult<u64>>>,
}

impl PumpHandle {
    /// The reader reached end of stream (or failed) and the thread is done
    /// pushing.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Wait for the render thread; returns frames pushed or the reader's error.
    pub fn join(mut self) -> AudResult<u64> {
        self.join_inner()
    }

    fn join_inner(&mut self) -> AudResult<u64> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| AudError::Configuration("pump thread panicked".into()))?,
            None => Ok(0),
        }
    }
}

impl Drop for PumpHandle {
    fn drop(&mut self) {
        self.stop();
        if let Err(err) = self.join_inner() {
            warn!("pump stopped with error: {err}");
        }
    }
}

/// Move `reader` to a render thread feeding a ring of `capacity_frames`.
pub fn spawn<R: AudioReader + 'static>(
    reader: R,
    capacity_frames: usize,
) -> AudResult<(Consumer<f32>, PumpHandle)> {
    let channels = reader.spec().channels.count();
    if channels == 0 || capacity_frames == 0 {
        return Err(AudError::Configuration(
            "pump needs at least one channel and a non-empty ring".into(),
        ));
    }

    let (producer, consumer) = RingBuffer::<f32>::new(capacity_frames * channels);
    let stop = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));

    let thread = thread::Builder::new()
        .name("audspace-pump".into())
        .spawn({
            let stop = stop.clone();
            let finished = finished.clone();
            move || {
                let result = run(reader, producer, &stop, capacity_frames);
                finished.store(true, Ordering::Release);
                result
            }
        })
        .map_err(|err| AudError::Configuration(format!("cannot spawn pump thread: {err}")))?;

    Ok((
        consumer,
        PumpHandle {
            stop,
            finished,
            thread: Some(thread),
        },
    ))
}

fn run<R: AudioReader>(
    mut reader: R,
    mut producer: Producer<f32>,
    stop: &AtomicBool,
    capacity_frames: usize,
) -> AudResult<u64> {
    let spec = reader.spec();
    let channels = spec.channels.count();
    let block_frames = MAX_BLOCK_SIZE.min(capacity_frames);
    let mut block = vec![0.0f32; block_frames * channels];
    let mut pushed = 0u64;
    info!("pump started: {spec}");

    while !stop.load(Ordering::Acquire) {
        let free_frames = producer.slots() / channels;
        if free_frames == 0 {
            thread::sleep(FULL_BACKOFF);
            continue;
        }

        let frames = free_frames.min(block_frames);
        let status = match reader.read(&mut block[..frames * channels]) {
            Ok(status) => status,
            Err(err) => {
                warn!("pump reader failed after {pushed} frames: {err}");
                return Err(err);
            }
        };

        let samples = status.frames * channels;
        if let Ok(chunk) = producer.write_chunk_uninit(samples) {
            chunk.fill_from_iter(block[..samples].iter().copied());
        }
        pushed += status.frames as u64;

        if status.end_of_stream {
            debug!("pump reached end of stream");
            break;
        }
    }

    info!("pump finished: {pushed} frames");
    Ok(pushed)
}

/// Pop up to `out.len()` samples; the remainder is filled with silence.
/// Returns the number of samples taken from the ring.
pub fn drain_into(consumer: &mut Consumer<f32>, out: &mut [f32]) -> usize {
    let n = consumer.slots().min(out.len());
    if let Ok(chunk) = consumer.read_chunk(n) {
        let (first, second) = chunk.as_slices();
        out[..first.len()].copy_from_slice(first);
        out[first.len()..n].copy_from_slice(second);
        chunk.commit_all();
    }
    out[n..].fill(0.0);
    n
}
