use std::f64::consts::TAU;

/// Sine phase accumulator addressed by absolute sample index.
///
/// The phase of sample `n` is `TAU * frequency * n / rate`, reduced modulo
/// one period before the multiply so precision does not degrade with `n`.
/// Jumping to any index is O(1).
#[derive(Debug, Clone)]
pub struct SinePhase {
    frequency: f64,
    rate: f64,
    /// Phase increment per sample, in cycles
    increment: f64,
    /// Current phase in cycles, always in [0, 1)
    cycle: f64,
    index: u64,
}

impl SinePhase {
    pub fn new(frequency: f32, rate: u32) -> Self {
        let frequency = frequency as f64;
        let rate = rate as f64;
        Self {
            frequency,
            rate,
            increment: (frequency / rate).rem_euclid(1.0),
            cycle: 0.0,
            index: 0,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Set the accumulator to sample `index` without replaying earlier samples.
    pub fn jump_to(&mut self, index: u64) {
        self.index = index;
        self.cycle = cycle_at(self.frequency, self.rate, index);
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = (TAU * self.cycle).sin() as f32;
        self.cycle += self.increment;
        if self.cycle >= 1.0 {
            self.cycle -= 1.0;
        }
        self.index += 1;
        sample
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

/// Phase, in cycles within [0, 1), of sample `index`.
fn cycle_at(frequency: f64, rate: f64, index: u64) -> f64 {
    // Split the index so the product stays exact for long streams.
    let period = rate as u64;
    if period == 0 {
        return 0.0;
    }
    let whole = (index / period) as f64;
    let rest = (index % period) as f64;
    let cycles_per_period = frequency.rem_euclid(1.0) * (rate / period as f64);
    (whole * cycles_per_period + rest * frequency / rate).rem_euclid(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_closed_form() {
        let mut phase = SinePhase::new(440.0, 44_100);
        let mut buffer = vec![0.0f32; 512];
        phase.render(&mut buffer);

        for (n, &sample) in buffer.iter().enumerate() {
            let expected = (TAU * 440.0 * n as f64 / 44_100.0).sin() as f32;
            assert!((sample - expected).abs() < 1e-5, "n={n}: {sample} vs {expected}");
        }
    }

    #[test]
    fn jump_matches_sequential() {
        let mut sequential = SinePhase::new(1_234.5, 48_000);
        let mut buffer = vec![0.0f32; 10_000];
        sequential.render(&mut buffer);

        let mut jumped = SinePhase::new(1_234.5, 48_000);
        jumped.jump_to(9_999);
        let sample = jumped.next_sample();
        assert!((sample - buffer[9_999]).abs() < 1e-4);
    }

    #[test]
    fn far_jump_is_precise() {
        let mut phase = SinePhase::new(440.0, 44_100);
        let n = 44_100u64 * 60 * 60 * 24;
        phase.jump_to(n + 25);
        let expected = (TAU * 440.0 * 25.0 / 44_100.0).sin() as f32;
        assert!((phase.next_sample() - expected).abs() < 1e-5);
    }
}
