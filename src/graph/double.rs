use log::debug;

use crate::{
    error::{AudError, AudResult},
    graph::node::{frames_in, AudioFactory, AudioReader, Block},
    spec::AudioSpec,
};

/*
Sequential Concatenation (Double)
=================================

Double plays one stream to its end and then continues seamlessly with a
second one. This is the time-axis counterpart of the effect wrappers: effects
transform a stream, Double joins two.

How It Works:
-------------
1. Both child readers are created up front (so a broken second source fails
   at create_reader time, not mid-playback).
2. Reads are served from the first reader until it reports end of stream.
3. The remainder of that same read, and every later read, comes from the
   second reader.

  First:   [a0 a1 a2 a3]
  Second:                [b0 b1 b2 ...]
  Output:  [a0 a1 a2 a3 b0 b1 b2 ...]

   ┌─────────┐  eos   ┌──────────┐  eos   ┌──────┐
   │  First  │ ─────→ │  Second  │ ─────→ │ Done │
   └─────────┘        └──────────┘        └──────┘

Both children must produce the same spec; joining a 44.1 kHz stream to a
48 kHz one would change pitch mid-stream, so that is a configuration error.
Resample one side first if needed.

Seeking:
--------
When the first stream's length is known, a target beyond it parks the first
reader at its end and seeks the second to the remainder. Otherwise the first
reader seeks and the second is rewound to its start.
*/

/// Plays `first`, then `second`.
pub struct DoubleFactory<A, B> {
    first: A,
    second: B,
}

impl<A, B> DoubleFactory<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: AudioFactory, B: AudioFactory> AudioFactory for DoubleFactory<A, B> {
    type Reader = DoubleReader<A::Reader, B::Reader>;

    fn create_reader(&self) -> AudResult<Self::Reader> {
        let first = self.first.create_reader()?;
        let second = self.second.create_reader()?;
        DoubleReader::new(first, second)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    First,
    Second,
    Done,
}

pub struct DoubleReader<A, B> {
    first: A,
    second: B,
    stage: Stage,
    spec: AudioSpec,
}

impl<A: AudioReader, B: AudioReader> DoubleReader<A, B> {
    pub fn new(first: A, second: B) -> AudResult<Self> {
        let spec = first.spec();
        if spec != second.spec() {
            return Err(AudError::SpecMismatch {
                first: spec,
                second: second.spec(),
            });
        }
        debug!("double reader: {spec}");
        Ok(Self {
            first,
            second,
            stage: Stage::First,
            spec,
        })
    }
}

impl<A: AudioReader, B: AudioReader> AudioReader for DoubleReader<A, B> {
    fn spec(&self) -> AudioSpec {
        self.spec
    }

    fn read(&mut self, out: &mut [f32]) -> AudResult<Block> {
        let wanted = frames_in(out, &self.spec)?;
        let channels = self.spec.channels.count();
        let mut done = 0;

        if self.stage == Stage::First {
            let block = self.first.read(out)?;
            done = block.frames;
            if !block.end_of_stream {
                return Ok(Block::full(done));
            }
            self.stage = Stage::Second;
        }

        if self.stage == Stage::Second {
            let block = self.second.read(&mut out[done * channels..])?;
            done += block.frames;
            if block.end_of_stream {
                self.stage = Stage::Done;
            }
        }

        if self.stage == Stage::Done {
            debug_assert!(done <= wanted);
            return Ok(Block::last(done));
        }
        Ok(Block::full(done))
    }

    fn seek(&mut self, frame: u64) -> AudResult<()> {
        match self.first.length() {
            Some(first_len) if frame >= first_len => {
                self.first.seek(first_len)?;
                self.second.seek(frame - first_len)?;
                self.stage = Stage::Second;
            }
            _ => {
                self.first.seek(frame)?;
                self.second.seek(0)?;
                self.stage = Stage::First;
            }
        }
        Ok(())
    }

    fn position(&self) -> u64 {
        self.first.position() + self.second.position()
    }

    fn length(&self) -> Option<u64> {
        Some(self.first.length()? + self.second.length()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        extensions::FactoryExt,
        node::testing::{collect, FailingFactory, VecFactory},
        sinus::SinusFactory,
    };
    use crate::spec::Channels;

    #[test]
    fn plays_first_then_second() {
        let double = VecFactory::mono(&[1.0, 2.0, 3.0]).then(VecFactory::mono(&[4.0, 5.0]));
        assert_eq!(collect(&double), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn boundary_inside_a_single_read() {
        let double = VecFactory::mono(&[1.0, 2.0, 3.0]).then(VecFactory::mono(&[4.0, 5.0, 6.0]));
        let mut reader = double.create_reader().unwrap();

        let mut out = [0.0; 4];
        assert_eq!(reader.read(&mut out).unwrap(), Block::full(4));
        assert_eq!(out, [1.0, 2.0, 3.0, 4.0]);

        let mut rest = [0.0; 4];
        assert_eq!(reader.read(&mut rest).unwrap(), Block::last(2));
        assert_eq!(&rest[..2], &[5.0, 6.0]);
    }

    #[test]
    fn seek_across_boundary() {
        let double = VecFactory::mono(&[1.0, 2.0]).then(VecFactory::mono(&[3.0, 4.0, 5.0]));
        let mut reader = double.create_reader().unwrap();
        assert_eq!(reader.length(), Some(5));

        reader.seek(3).unwrap();
        let mut out = [0.0; 2];
        reader.read(&mut out).unwrap();
        assert_eq!(out, [4.0, 5.0]);

        reader.seek(1).unwrap();
        assert_eq!(reader.position(), 1);
        let mut out = [0.0; 3];
        reader.read(&mut out).unwrap();
        assert_eq!(out, [2.0, 3.0, 4.0]);
    }

    #[test]
    fn mismatched_specs_are_rejected() {
        let stereo = VecFactory::with_spec(AudioSpec::float(44_100, Channels::STEREO), &[0.0; 4]);
        let double = VecFactory::mono(&[0.0; 2]).then(stereo);
        let err = double.create_reader().err().unwrap();
        assert!(matches!(err, AudError::SpecMismatch { .. }));
    }

    #[test]
    fn child_failure_propagates() {
        let double = DoubleFactory::new(VecFactory::mono(&[0.0]), FailingFactory);
        let err = double.create_reader().err().unwrap();
        assert!(matches!(err, AudError::Decode(_)));
    }

    #[test]
    fn infinite_first_never_reaches_second() {
        let double = SinusFactory::new(440.0, 44_100).then(SinusFactory::new(880.0, 44_100));
        let mut reader = double.create_reader().unwrap();
        assert_eq!(reader.length(), None);

        let mut out = vec![0.0; 1024];
        reader.read(&mut out).unwrap();
        assert_eq!(reader.position(), 1024);
    }
}
