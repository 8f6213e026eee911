//! Factories and the readers they produce.
//!
//! A factory is an immutable description of a stream; a reader is one
//! playback of it. Factories own their children, so a graph is a tree built
//! bottom-up, and `create_reader` walks it top-down returning a matching tree
//! of readers. The `extensions` module adds fluent helpers so graphs can be
//! written as chains.

/// Sequential concatenation of two streams.
pub mod double;
/// Fluent combinators (`.then()`, `.sum()`, `.resample_sinc()`, etc.).
pub mod extensions;
/// WAV sources backed by a path or a shared in-memory buffer.
pub mod file;
/// Filter readers plus the generic IIR and biquad factories.
pub mod filter;
/// Core reader/factory traits shared by every node.
pub mod node;
/// Full-wave rectifier.
pub mod rectify;
/// Channel mapping and sample-rate conversion toward a device spec.
pub mod resample;
/// Sine tone source.
pub mod sinus;
/// Running-sum integrator.
pub mod sum;

pub use double::DoubleFactory;
pub use extensions::FactoryExt;
pub use file::{FileFactory, SourceConfig};
pub use filter::{BiquadFactory, IirFilterFactory};
pub use node::{AudioFactory, AudioReader, Block, BoxedFactory};
pub use rectify::RectifyFactory;
pub use resample::{LinearResampleFactory, MixerFactory, SincResampleFactory};
pub use sinus::SinusFactory;
pub use sum::SumFactory;
