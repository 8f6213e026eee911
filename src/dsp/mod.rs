//! Low-level kernels used by the graph readers.
//!
//! These stay focused on the per-sample math (filter steps, phase
//! accumulation, interpolation weights, channel mapping) so the readers in
//! [`crate::graph`] can concentrate on buffering, seeking and end-of-stream
//! handling.

/// Interleaved channel layout conversion.
pub mod channels;
/// IIR and callback filter kernels with per-channel history.
pub mod filter;
/// Sine phase accumulator with O(1) seeking.
pub mod oscillator;
/// Linear and windowed-sinc interpolation kernels.
pub mod resample;

pub use filter::{CallbackKernel, FilterHistory, FilterKernel, IirKernel};
