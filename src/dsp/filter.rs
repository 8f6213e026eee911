use std::f64::consts::TAU;

use crate::error::{AudError, AudResult};

/*
| kernel          | constructed by          | input taps | output taps |
| --------------- | ----------------------- | ---------- | ----------- |
| general IIR     | IirKernel::new(b, a)    | len(b)     | len(a) - 1  |
| integrator      | IirKernel::integrator() | 1          | 1           |
| gain            | IirKernel::gain(v)      | 1          | 0           |
| biquad LP / HP  | IirKernel::lowpass(..)  | 3          | 2           |
| callback        | CallbackKernel::new     | chosen     | chosen      |

    y[n] = ( Σ b[i]·x[n-i]  -  Σ_{j>=1} a[j]·y[n-j] ) / a[0]

History is kept in f64 so long-running feedback (the integrator in particular)
does not accumulate f32 rounding error.
*/

/// Per-channel delay lines for past inputs and past outputs.
#[derive(Debug, Clone)]
pub struct FilterHistory {
    x: Vec<f64>,
    y: Vec<f64>,
    x_pos: usize,
    y_pos: usize,
}

impl FilterHistory {
    pub fn new(input_taps: usize, output_taps: usize) -> Self {
        Self {
            x: vec![0.0; input_taps.max(1)],
            y: vec![0.0; output_taps],
            x_pos: 0,
            y_pos: 0,
        }
    }

    /// Input sample `x[n - delay]`. `delay = 0` is the sample being filtered.
    #[inline]
    pub fn x(&self, delay: usize) -> f64 {
        let len = self.x.len();
        if delay >= len {
            return 0.0;
        }
        self.x[(self.x_pos + len - delay) % len]
    }

    /// Output sample `y[n - delay]` for `delay >= 1`.
    #[inline]
    pub fn y(&self, delay: usize) -> f64 {
        let len = self.y.len();
        if delay == 0 || delay > len {
            return 0.0;
        }
        self.y[(self.y_pos + len + 1 - delay) % len]
    }

    #[inline]
    fn push_input(&mut self, sample: f64) {
        self.x_pos = (self.x_pos + 1) % self.x.len();
        self.x[self.x_pos] = sample;
    }

    #[inline]
    fn push_output(&mut self, sample: f64) {
        if self.y.is_empty() {
            return;
        }
        self.y_pos = (self.y_pos + 1) % self.y.len();
        self.y[self.y_pos] = sample;
    }

    pub fn reset(&mut self) {
        self.x.fill(0.0);
        self.y.fill(0.0);
        self.x_pos = 0;
        self.y_pos = 0;
    }
}

/// One-sample filter step over a channel's history.
pub trait FilterKernel: Send {
    fn input_taps(&self) -> usize;

    fn output_taps(&self) -> usize;

    fn filter(&self, history: &FilterHistory) -> f64;

    /// Feed one input sample, return the filtered output and record it.
    #[inline]
    fn next_sample(&self, history: &mut FilterHistory, sample: f32) -> f32 {
        history.push_input(sample as f64);
        let out = self.filter(history);
        history.push_output(out);
        out as f32
    }

    fn history(&self) -> FilterHistory {
        FilterHistory::new(self.input_taps(), self.output_taps())
    }
}

/// Direct-form IIR filter with coefficients normalized by `a[0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IirKernel {
    b: Vec<f64>,
    a: Vec<f64>,
}

impl IirKernel {
    pub fn new(b: &[f32], a: &[f32]) -> AudResult<Self> {
        if b.is_empty() {
            return Err(AudError::Construction(
                "IIR filter needs at least one feed-forward coefficient".into(),
            ));
        }
        let a0 = match a.first() {
            Some(&a0) if a0 != 0.0 && a0.is_finite() => a0 as f64,
            _ => {
                return Err(AudError::Construction(
                    "IIR filter needs a non-zero a[0] coefficient".into(),
                ))
            }
        };
        if b.iter().chain(a.iter()).any(|c| !c.is_finite()) {
            return Err(AudError::Construction("IIR coefficients must be finite".into()));
        }

        Ok(Self {
            b: b.iter().map(|&c| c as f64 / a0).collect(),
            a: a.iter().map(|&c| c as f64 / a0).collect(),
        })
    }

    /// Running sum: `b = [1]`, `a = [1, -1]`.
    pub fn integrator() -> Self {
        Self {
            b: vec![1.0],
            a: vec![1.0, -1.0],
        }
    }

    /// Pure gain: `b = [gain]`, `a = [1]`.
    pub fn gain(gain: f32) -> Self {
        Self {
            b: vec![gain as f64],
            a: vec![1.0],
        }
    }

    /// Second-order lowpass (RBJ cookbook biquad).
    pub fn lowpass(rate: u32, cutoff_hz: f32, q: f32) -> AudResult<Self> {
        let (cos_w0, alpha) = biquad_terms(rate, cutoff_hz, q)?;
        let b1 = 1.0 - cos_w0;
        Ok(Self::biquad([b1 / 2.0, b1, b1 / 2.0], cos_w0, alpha))
    }

    /// Second-order highpass (RBJ cookbook biquad).
    pub fn highpass(rate: u32, cutoff_hz: f32, q: f32) -> AudResult<Self> {
        let (cos_w0, alpha) = biquad_terms(rate, cutoff_hz, q)?;
        let b1 = 1.0 + cos_w0;
        Ok(Self::biquad([b1 / 2.0, -b1, b1 / 2.0], cos_w0, alpha))
    }

    fn biquad(b: [f64; 3], cos_w0: f64, alpha: f64) -> Self {
        let a0 = 1.0 + alpha;
        Self {
            b: b.iter().map(|c| c / a0).collect(),
            a: vec![1.0, -2.0 * cos_w0 / a0, (1.0 - alpha) / a0],
        }
    }

    pub fn b(&self) -> &[f64] {
        &self.b
    }

    pub fn a(&self) -> &[f64] {
        &self.a
    }
}

fn biquad_terms(rate: u32, cutoff_hz: f32, q: f32) -> AudResult<(f64, f64)> {
    let nyquist = rate as f32 / 2.0;
    if rate == 0 || !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
        return Err(AudError::Configuration(format!(
            "cutoff {cutoff_hz} Hz must lie between 0 and {nyquist} Hz"
        )));
    }
    if !(q > 0.0 && q.is_finite()) {
        return Err(AudError::Configuration(format!("filter Q must be positive, got {q}")));
    }

    let w0 = TAU * cutoff_hz as f64 / rate as f64;
    Ok((w0.cos(), w0.sin() / (2.0 * q as f64)))
}

impl FilterKernel for IirKernel {
    fn input_taps(&self) -> usize {
        self.b.len()
    }

    fn output_taps(&self) -> usize {
        self.a.len() - 1
    }

    #[inline]
    fn filter(&self, history: &FilterHistory) -> f64 {
        let feed_forward: f64 = self
            .b
            .iter()
            .enumerate()
            .map(|(i, b)| b * history.x(i))
            .sum();
        let feedback: f64 = self
            .a
            .iter()
            .enumerate()
            .skip(1)
            .map(|(j, a)| a * history.y(j))
            .sum();
        feed_forward - feedback
    }
}

pub type FilterCallback = fn(&FilterHistory) -> f64;

/// Filter whose step is an arbitrary function of the history.
#[derive(Clone, Copy)]
pub struct CallbackKernel {
    input_taps: usize,
    output_taps: usize,
    callback: FilterCallback,
}

impl CallbackKernel {
    pub fn new(input_taps: usize, output_taps: usize, callback: FilterCallback) -> Self {
        Self {
            input_taps,
            output_taps,
            callback,
        }
    }
}

impl FilterKernel for CallbackKernel {
    fn input_taps(&self) -> usize {
        self.input_taps
    }

    fn output_taps(&self) -> usize {
        self.output_taps
    }

    #[inline]
    fn filter(&self, history: &FilterHistory) -> f64 {
        (self.callback)(history)
    }
}
