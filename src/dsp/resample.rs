use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{AudError, AudResult};

/*
Sample-Rate Conversion Kernels
==============================

Both resamplers place output frame k at input position

    t_k = k · in_rate / out_rate

computed in integers, so the position of frame k never depends on how many
frames came before it. Seeking and sequential reading land on the same
positions, and a stream of L input frames yields exactly

    ceil(L · out_rate / in_rate)

output frames.

Linear:
    y = x[i] + (x[i+1] - x[i]) · frac      i = floor(t_k), frac = t_k - i

Sinc:
    rubato's SincFixedIn (windowed sinc, cutoff lowered when downsampling).
    It consumes fixed input chunks and starts with `output_delay()` frames of
    latency. The reader feeds `lead_frames()` copies of the first frame ahead
    of the stream and drops `startup_skip()` outputs, so the first kept frame
    sits on input frame 0 and a constant input stays constant at the start.

    sinc_len   use
    64         cheap, audible droop near Nyquist
    128        default
    256        offline rendering
*/

/// Linear interpolation between two samples.
#[inline]
pub fn lerp(a: f32, b: f32, frac: f64) -> f32 {
    a + ((b - a) as f64 * frac) as f32
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Exact mapping between output and input frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateClock {
    in_rate: u64,
    out_rate: u64,
}

impl RateClock {
    /// Both rates must be non-zero.
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        Self {
            in_rate: in_rate.max(1) as u64,
            out_rate: out_rate.max(1) as u64,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.in_rate == self.out_rate
    }

    /// `out_rate / in_rate`
    pub fn ratio(&self) -> f64 {
        self.out_rate as f64 / self.in_rate as f64
    }

    /// Input frame under output frame `frame`, and the fraction past it.
    pub fn input_position(&self, frame: u64) -> (u64, f64) {
        let t = frame as u128 * self.in_rate as u128;
        let out = self.out_rate as u128;
        ((t / out) as u64, (t % out) as f64 / out as f64)
    }

    /// Output frames produced from `input_frames` input frames; also the
    /// first output frame at or after input frame `input_frames`.
    pub fn output_length(&self, input_frames: u64) -> u64 {
        let scaled = input_frames as u128 * self.out_rate as u128;
        scaled.div_ceil(self.in_rate as u128) as u64
    }

    /// Smallest input period after which input and output frames coincide
    /// again.
    pub fn alignment(&self) -> u64 {
        self.in_rate / gcd(self.in_rate, self.out_rate)
    }
}

/// Windowed-sinc resampler over planar channel buffers.
pub struct SincResampler {
    inner: SincFixedIn<f32>,
    clock: RateClock,
    sinc_len: usize,
    lead: u64,
}

impl SincResampler {
    pub const DEFAULT_SINC_LEN: usize = 128;
    /// Input frames consumed per `process` call.
    pub const CHUNK_FRAMES: usize = 1024;

    pub fn new(clock: RateClock, sinc_len: usize, channels: usize) -> AudResult<Self> {
        // rubato works in multiples of 8 taps
        let sinc_len = sinc_len.max(8).next_multiple_of(8);
        let parameters = SincInterpolationParameters {
            sinc_len,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let inner = SincFixedIn::new(
            clock.ratio(),
            1.0,
            parameters,
            Self::CHUNK_FRAMES,
            channels,
        )
        .map_err(|err| AudError::Configuration(format!("cannot build sinc resampler: {err}")))?;

        // Prefer a lead that keeps output frames on the input grid; very
        // coarse ratios fall back to the plain window length.
        let step = clock.alignment();
        let aligned = (sinc_len as u64).div_ceil(step) * step;
        let lead = if aligned <= 8 * sinc_len as u64 {
            aligned
        } else {
            sinc_len as u64
        };

        Ok(Self {
            inner,
            clock,
            sinc_len,
            lead,
        })
    }

    pub fn sinc_len(&self) -> usize {
        self.sinc_len
    }

    /// Input frames needed ahead of a position for its output to be exact.
    pub fn context_frames(&self) -> u64 {
        self.sinc_len as u64
    }

    /// Copies of the first frame fed before the stream starts.
    pub fn lead_frames(&self) -> u64 {
        self.lead
    }

    /// Output frames to drop so the first kept one sits on input frame 0.
    pub fn startup_skip(&self) -> u64 {
        let (in_rate, out_rate) = (self.clock.in_rate as u128, self.clock.out_rate as u128);
        // Rounded; exact whenever the lead is on the grid.
        let lead_out = (2 * self.lead as u128 * out_rate + in_rate) / (2 * in_rate);
        self.inner.output_delay() as u64 + lead_out as u64
    }

    pub fn input_frames(&self) -> usize {
        self.inner.input_frames_next()
    }

    pub fn output_frames_max(&self) -> usize {
        self.inner.output_frames_max()
    }

    /// Resample one chunk of `input_frames()` frames per channel into
    /// `output`; returns the frames written per channel.
    pub fn process(&mut self, input: &[Vec<f32>], output: &mut [Vec<f32>]) -> AudResult<usize> {
        let (_, written) = self
            .inner
            .process_into_buffer(input, output, None)
            .map_err(|err| AudError::Configuration(format!("sinc resampler failed: {err}")))?;
        Ok(written)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
