//! Whole-graph benchmarks.
//!
//! These model a player: a decoded file followed by a filter and conversion
//! to the device spec.

mod playback;

pub use playback::bench_playback;
