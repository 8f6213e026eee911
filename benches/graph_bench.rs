//! Benchmarks for readers and complete graph chains.
//!
//! Run with: cargo bench
//!
//! A reader has to deliver a block well inside the device callback period.
//! Reference deadlines at 48kHz:
//!   - 64 frames  = 1.33ms
//!   - 128 frames = 2.67ms
//!   - 256 frames = 5.33ms
//!   - 512 frames = 10.67ms
//!
//! Benchmark groups:
//!   - readers/*  Single nodes over an infinite tone (sinus, filters, resamplers)
//!   - chains/*   Decoded WAV through a realistic playback chain

use criterion::{criterion_group, criterion_main};

mod chains;
mod readers;

/// Common block sizes, in frames.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    readers::bench_sinus,
    readers::bench_filter,
    readers::bench_resample,
    chains::bench_playback,
);
criterion_main!(benches);
