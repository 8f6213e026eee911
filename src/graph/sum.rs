use log::debug;

use crate::{
    dsp::filter::IirKernel,
    error::AudResult,
    graph::{
        filter::FilterReader,
        node::{AudioFactory, AudioReader},
    },
};

/*
Running Sum (Integrator)
========================

    y[n] = x[n] + y[n-1]          b = [1],  a = [1, -1]

Each output is the sum of every input so far:

    input:  [x0, x1,      x2          ]
    output: [x0, x0 + x1, x0 + x1 + x2]

The accumulator starts at zero for every new reader and after every seek.
It is kept in f64, so a zero-mean input (an alternating ±1 stream, say) stays
exactly bounded even after millions of samples. A DC input grows without
limit; that is the defined behaviour of an integrator and no periodic reset is
applied.
*/

/// Cumulative sum of its input.
pub struct SumFactory<F> {
    input: F,
}

impl<F> SumFactory<F> {
    pub fn new(input: F) -> Self {
        Self { input }
    }
}

impl<F: AudioFactory> AudioFactory for SumFactory<F> {
    type Reader = FilterReader<F::Reader, IirKernel>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let input = self.input.create_reader()?;
        debug!("sum reader: {}", input.spec());
        Ok(FilterReader::new(input, IirKernel::integrator()))
    }
}
