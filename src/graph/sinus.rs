use log::debug;

use crate::{
    dsp::oscillator::SinePhase,
    error::{AudError, AudResult},
    graph::node::{frames_in, AudioFactory, AudioReader, Block},
    spec::{AudioSpec, Channels},
};

/*
Sine Tone Source
================

The simplest source in the graph: a pure sine at a fixed frequency. It has no
children and never ends, so `length()` is `None` and every read fills the
whole buffer.

    sample[n] = sin(2π · frequency · n / rate)

The phase comes from the absolute sample index rather than from replaying the
accumulator, so seeking to any point is O(1) and two readers that seek to the
same index produce identical samples.

Example usage:
  let tone = SinusFactory::new(440.0, 44_100);
  let mut reader = tone.create_reader()?;
  reader.seek(44_100)?;          // one second in
  reader.read(&mut block)?;
*/

/// Mono sine tone at a fixed frequency.
#[derive(Debug, Clone)]
pub struct SinusFactory {
    frequency: f32,
    rate: u32,
}

impl SinusFactory {
    pub fn new(frequency: f32, rate: u32) -> Self {
        Self { frequency, rate }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }
}

impl AudioFactory for SinusFactory {
    type Reader = SinusReader;

    fn create_reader(&self) -> AudResult<SinusReader> {
        let spec = AudioSpec::float(self.rate, Channels::MONO);
        spec.validate()?;
        if !self.frequency.is_finite() {
            return Err(AudError::Configuration(format!(
                "sine frequency must be finite, got {}",
                self.frequency
            )));
        }

        debug!("sinus reader: {} Hz at {}", self.frequency, spec);
        Ok(SinusReader {
            phase: SinePhase::new(self.frequency, self.rate),
            spec,
        })
    }
}

pub struct SinusReader {
    phase: SinePhase,
    spec: AudioSpec,
}

impl AudioReader for SinusReader {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let frames = frames_in(out, &self.spec)?;
        self.phase.render(out);
        Ok(Block::full(frames))
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        self.phase.jump_to(frame);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.phase.index()
    }

    fn length(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn seek_then_read_matches_closed_form() {
        let factory = SinusFactory::new(440.0, 44_100);
        let mut reader = factory.create_reader().unwrap();

        for n in [0u64, 1, 99, 44_100, 1_000_003] {
            reader.seek(n).unwrap();
            let mut sample = [0.0f32; 1];
            reader.read(&mut sample).unwrap();

            let expected = (TAU * 440.0 * n as f64 / 44_100.0).sin() as f32;
            assert!(
                (sample[0] - expected).abs() < 1e-5,
                "n={n}: expected {expected}, got {}",
                sample[0]
            );
        }
    }

    #[test]
    fn stream_never_ends() {
        let mut reader = SinusFactory::new(100.0, 8_000).create_reader().unwrap();
        let mut out = vec![0.0; 4_096];
        for _ in 0..4 {
            let block = reader.read(&mut out).unwrap();
            assert_eq!(block, Block::full(4_096));
        }
        assert_eq!(reader.length(), None);
        assert_eq!(reader.position(), 4 * 4_096);
    }

    #[test]
    fn readers_are_independent() {
        let factory = SinusFactory::new(440.0, 44_100);
        let mut a = factory.create_reader().unwrap();
        let mut b = factory.create_reader().unwrap();

        let mut scratch = vec![0.0; 300];
        a.read(&mut scratch).unwrap();

        let mut first_a = [0.0];
        let mut first_b = [0.0];
        a.read(&mut first_a).unwrap();
        b.read(&mut first_b).unwrap();

        assert_eq!(b.position(), 1);
        assert_eq!(first_b[0], 0.0);
        assert_ne!(first_a[0], first_b[0]);
    }

    #[test]
    fn zero_rate_fails_at_create_reader() {
        let factory = SinusFactory::new(440.0, 0);
        let err = factory.create_reader().err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }
}
