pub mod buffer;
#[cfg(feature = "serde")]
pub mod config; // Graph descriptions loaded from YAML
pub mod dsp;
pub mod error;
pub mod graph; // Composable factories and their readers
pub mod io; // Output encoding and realtime handoff
pub mod spec;

pub use error::{AudError, AudResult, ErrorKind};
pub use spec::{AudioSpec, Channels, DeviceSpec, SampleFormat};

/// Largest block, in frames, a reader moves through its scratch buffers at once.
pub const MAX_BLOCK_SIZE: usize = 2048;
