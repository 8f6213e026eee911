use crate::spec::SampleFormat;

/*
Device Sample Encoding
======================

Inside the graph every sample is an f32 in roughly [-1, 1]. At the output
boundary it has to become whatever the device spec asks for. Integer formats
clip to full scale first; float formats pass values through unchanged.

    format    bytes   full scale        silence
    U8        1       0 ..= 255         128
    S16       2       ±32767            0
    S24       3       ±8388607          0
    S32       4       ±2147483647       0
    Float32   4       ±1.0              0.0
    Float64   8       ±1.0              0.0

All multi-byte formats are little-endian.
*/

/// Append `samples` to `out`, encoded as `format`.
pub fn encode_interleaved(samples: &[f32], format: SampleFormat, out: &mut Vec<u8>) {
    out.reserve(samples.len() * format.size());
    match format {
        SampleFormat::U8 => out.extend(
            samples
                .iter()
                .map(|&s| (quantize(s, format) + 128) as u8),
        ),
        SampleFormat::S16 => {
            for &s in samples {
                out.extend_from_slice(&(quantize(s, format) as i16).to_le_bytes());
            }
        }
        SampleFormat::S24 => {
            for &s in samples {
                out.extend_from_slice(&quantize(s, format).to_le_bytes()[..3]);
            }
        }
        SampleFormat::S32 => {
            for &s in samples {
                out.extend_from_slice(&quantize(s, format).to_le_bytes());
            }
        }
        SampleFormat::Float32 => {
            for &s in samples {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
        SampleFormat::Float64 => {
            for &s in samples {
                out.extend_from_slice(&(s as f64).to_le_bytes());
            }
        }
    }
}

/// Signed integer value of `sample` at the full scale of `format`, after
/// clipping. `U8` is returned centred on zero (-127..=127). Float formats
/// have no integer scale and yield 0.
pub fn quantize(sample: f32, format: SampleFormat) -> i32 {
    let full_scale = match format {
        SampleFormat::U8 => 127.0,
        SampleFormat::S16 => i16::MAX as f64,
        SampleFormat::S24 => 8_388_607.0,
        SampleFormat::S32 => i32::MAX as f64,
        SampleFormat::Float32 | SampleFormat::Float64 => return 0,
    };
    (clip(sample) as f64 * full_scale).round() as i32
}

#[inline]
fn clip(sample: f32) -> f32 {
    if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    }
}
