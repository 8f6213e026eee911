use log::debug;

use crate::{
    dsp::filter::{CallbackKernel, FilterHistory},
    error::AudResult,
    graph::{
        filter::FilterReader,
        node::{AudioFactory, AudioReader},
    },
};

/// Full-wave rectifier: `y[n] = |x[n]|`.
///
/// Implemented as a one-tap callback filter with no output history, so it
/// shares seeking and buffering behaviour with every other filter reader.
pub struct RectifyFactory<F> {
    input: F,
}

impl<F> RectifyFactory<F> {
    pub fn new(input: F) -> Self {
        Self { input }
    }
}

fn rectify(history: &FilterHistory) -> f64 {
    history.x(0).abs()
}

impl<F: AudioFactory> AudioFactory for RectifyFactory<F> {
    type Reader = FilterReader<F::Reader, CallbackKernel>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let input = self.input.create_reader()?;
        debug!("rectify reader: {}", input.spec());
        Ok(FilterReader::new(input, CallbackKernel::new(1, 0, rectify)))
    }
}
