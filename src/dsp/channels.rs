//! Channel layout conversion for interleaved frames.

/// Map one interleaved frame from `input.len()` channels to `output.len()`.
///
/// - same count: copy
/// - mono source: duplicate to every output channel
/// - mono target: average of all inputs
/// - otherwise: output channel `c` takes input channel `c % inputs`
#[inline]
pub fn remap_frame(input: &[f32], output: &mut [f32]) {
    let inputs = input.len();
    if inputs == 0 {
        output.fill(0.0);
        return;
    }

    if inputs == output.len() {
        output.copy_from_slice(input);
    } else if inputs == 1 {
        output.fill(input[0]);
    } else if output.len() == 1 {
        output[0] = input.iter().sum::<f32>() / inputs as f32;
    } else {
        for (c, out) in output.iter_mut().enumerate() {
            *out = input[c % inputs];
        }
    }
}

/// Remap a block of interleaved frames. `output` must hold as many frames as
/// `input`.
pub fn remap_block(input: &[f32], in_channels: usize, output: &mut [f32], out_channels: usize) {
    for (frame_in, frame_out) in input
        .chunks_exact(in_channels)
        .zip(output.chunks_exact_mut(out_channels))
    {
        remap_frame(frame_in, frame_out);
    }
}
