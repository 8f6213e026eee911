use crate::{
    error::AudResult,
    graph::{
        double::DoubleFactory,
        filter::{BiquadFactory, IirFilterFactory},
        node::{AudioFactory, BoxedFactory},
        rectify::RectifyFactory,
        resample::{LinearResampleFactory, SincResampleFactory},
        sum::SumFactory,
    },
    spec::DeviceSpec,
};

/// Fluent combinators for building factory graphs.
///
/// ```ignore
/// let graph = FileFactory::open("intro.wav")
///     .then(FileFactory::open("loop.wav"))
///     .highpass(40.0, 0.707)
///     .resample_sinc(DeviceSpec::new(48_000, Channels::STEREO, SampleFormat::S16));
/// ```
pub trait FactoryExt: AudioFactory + Sized {
    /// Play `self`, then `next`.
    fn then<B: AudioFactory>(self, next: B) -> DoubleFactory<Self, B> {
        DoubleFactory::new(self, next)
    }

    fn sum(self) -> SumFactory<Self> {
        SumFactory::new(self)
    }

    fn rectify(self) -> RectifyFactory<Self> {
        RectifyFactory::new(self)
    }

    fn iir(self, b: &[f32], a: &[f32]) -> AudResult<IirFilterFactory<Self>> {
        IirFilterFactory::new(self, b, a)
    }

    fn volume(self, gain: f32) -> IirFilterFactory<Self> {
        IirFilterFactory::volume(self, gain)
    }

    fn lowpass(self, cutoff_hz: f32, q: f32) -> BiquadFactory<Self> {
        BiquadFactory::lowpass(self, cutoff_hz, q)
    }

    fn highpass(self, cutoff_hz: f32, q: f32) -> BiquadFactory<Self> {
        BiquadFactory::highpass(self, cutoff_hz, q)
    }

    fn resample_linear(self, target: DeviceSpec) -> LinearResampleFactory<Self> {
        LinearResampleFactory::new(self, target)
    }

    fn resample_sinc(self, target: DeviceSpec) -> SincResampleFactory<Self> {
        SincResampleFactory::new(self, target)
    }

    fn boxed(self) -> BoxedFactory
    where
        Self: 'static,
    {
        BoxedFactory::new(self)
    }
}

impl<T: AudioFactory> FactoryExt for T {}
