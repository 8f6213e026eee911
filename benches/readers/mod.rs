//! Benchmarks for individual readers.

mod filter;
mod resample;
mod sinus;

pub use filter::bench_filter;
pub use resample::bench_resample;
pub use sinus::bench_sinus;
