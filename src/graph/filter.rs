use log::debug;

use crate::{
    dsp::filter::{FilterHistory, FilterKernel, IirKernel},
    error::AudResult,
    graph::node::{AudioFactory, AudioReader, Block},
    spec::AudioSpec,
};

/*
Filter Readers
==============

Every effect in the graph that maps an input stream to an output stream of the
same shape, sample by sample, is a FilterReader: a child reader plus a filter
kernel. The kernel holds the fixed description (coefficients or a callback);
the reader holds one history per channel, so channels never bleed into each
other and two readers built from one factory never share state.

    child.read(block) ──→ for each frame, for each channel c:
                              block[c] = kernel.next_sample(history[c], block[c])

Factories in this family:
-------------------------
- IirFilterFactory   arbitrary b / a coefficients
- SumFactory         integrator, b = [1], a = [1, -1]        (sum.rs)
- RectifyFactory     |x|, callback kernel                    (rectify.rs)
- BiquadFactory      second-order lowpass / highpass from cutoff and Q

History is zeroed when a reader is created and after every seek: a filter
that jumps in time has no meaningful past.

Example usage:
  // Gentle low end: second-order lowpass at 800 Hz
  let dark = FileFactory::open("loop.wav").lowpass(800.0, 0.707);

  // Custom IIR: one-pole smoother y[n] = 0.1 x[n] + 0.9 y[n-1]
  let smooth = source.iir(&[0.1], &[1.0, -0.9])?;
*/

/// Reader applying a filter kernel to every channel of its child.
pub struct FilterReader<R, K> {
    input: R,
    kernel: K,
    histories: Vec<FilterHistory>,
}

impl<R: AudioReader, K: FilterKernel> FilterReader<R, K> {
    pub fn new(input: R, kernel: K) -> Self {
        let histories = (0..input.spec().channels.count())
            .map(|_| kernel.history())
            .collect();
        Self {
            input,
            kernel,
            histories,
        }
    }

    fn reset(&mut self) {
        for history in &mut self.histories {
            history.reset();
        }
    }
}

impl<R: AudioReader, K: FilterKernel> AudioReader for FilterReader<R, K> {
    fn spec(&self) -> AudioSpec {
        self.input.spec()
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let block = self.input.read(out)?;
        let channels = self.histories.len();

        for frame in out[..block.frames * channels].chunks_exact_mut(channels) {
            for (sample, history) in frame.iter_mut().zip(self.histories.iter_mut()) {
                *sample = self.kernel.next_sample(history, *sample);
            }
        }
        Ok(block)
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        self.input.seek(frame)?;
        self.reset();
        Ok(())
    }

    fn position(&self) -> u64 {
        self.input.position()
    }

    fn length(&self) -> Option<u64> {
        self.input.length()
    }
}

/// Applies a general IIR filter to its input.
pub struct IirFilterFactory<F> {
    input: F,
    kernel: IirKernel,
}

impl<F> IirFilterFactory<F> {
    /// `b` are the feed-forward and `a` the feedback coefficients. Fails with
    /// a construction error when `b` is empty or `a[0]` is zero.
    pub fn new(input: F, b: &[f32], a: &[f32]) -> AudResult<Self> {
        Ok(Self::with_kernel(input, IirKernel::new(b, a)?))
    }

    /// Scale every sample by `gain`.
    pub fn volume(input: F, gain: f32) -> Self {
        Self::with_kernel(input, IirKernel::gain(gain))
    }

    pub(crate) fn with_kernel(input: F, kernel: IirKernel) -> Self {
        Self { input, kernel }
    }
}

impl<F: AudioFactory> AudioFactory for IirFilterFactory<F> {
    type Reader = FilterReader<F::Reader, IirKernel>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let input = self.input.create_reader()?;
        debug!(
            "iir filter reader: b={:?} a={:?}",
            self.kernel.b(),
            self.kernel.a()
        );
        Ok(FilterReader::new(input, self.kernel.clone()))
    }
}

/// Second-order filter response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Lowpass,
    Highpass,
}

/// Biquad lowpass/highpass whose coefficients follow the input's sample rate.
pub struct BiquadFactory<F> {
    input: F,
    response: Response,
    cutoff_hz: f32,
    q: f32,
}

impl<F> BiquadFactory<F> {
    pub fn lowpass(input: F, cutoff_hz: f32, q: f32) -> Self {
        Self {
            input,
            response: Response::Lowpass,
            cutoff_hz,
            q,
        }
    }

    pub fn highpass(input: F, cutoff_hz: f32, q: f32) -> Self {
        Self {
            input,
            response: Response::Highpass,
            cutoff_hz,
            q,
        }
    }
}

impl<F: AudioFactory> AudioFactory for BiquadFactory<F> {
    type Reader = FilterReader<F::Reader, IirKernel>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let input = self.input.create_reader()?;
        let rate = input.spec().rate;
        let kernel = match self.response {
            Response::Lowpass => IirKernel::lowpass(rate, self.cutoff_hz, self.q)?,
            Response::Highpass => IirKernel::highpass(rate, self.cutoff_hz, self.q)?,
        };
        debug!(
            "{:?} reader: {} Hz, Q {} at {} Hz",
            self.response, self.cutoff_hz, self.q, rate
        );
        Ok(FilterReader::new(input, kernel))
    }
}
