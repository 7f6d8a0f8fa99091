/// Full-band soft saturation
///
/// Blends the dry signal with a tanh-shaped copy. The blend amount grows with
/// the square of the percentage, so low settings stay subtle.
use super::chain::AudioEffect;

/// Stateless tanh saturator
#[derive(Debug, Clone, Copy)]
pub struct Saturator {
    mix: f64,
    drive: f64,
}

impl Saturator {
    /// Create a saturator for `percent` in 0..=100
    pub fn new(percent: f64) -> Self {
        let mix = (percent / 100.0).powi(2);
        Self {
            mix,
            drive: 1.0 + 4.0 * mix,
        }
    }

    /// Saturate one sample
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        (1.0 - self.mix) * x + self.mix * (x * self.drive).tanh()
    }
}

impl AudioEffect for Saturator {
    fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.apply(f64::from(*sample)) as f32;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Saturator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_percent_is_identity() {
        let mut saturator = Saturator::new(0.0);
        let mut buffer = vec![0.9, -0.4, 0.0, 1.2];
        saturator.process(&mut buffer);
        assert_eq!(buffer, vec![0.9, -0.4, 0.0, 1.2]);
    }

    #[test]
    fn full_saturation_is_pure_tanh() {
        let saturator = Saturator::new(100.0);
        assert!((saturator.apply(0.5) - (2.5_f64).tanh()).abs() < 1e-12);
    }

    #[test]
    fn output_is_odd_and_bounded() {
        let saturator = Saturator::new(60.0);
        for x in [0.1, 0.5, 1.0, 3.0] {
            assert!((saturator.apply(x) + saturator.apply(-x)).abs() < 1e-12);
        }
        // Pure tanh never leaves [-1, 1]
        assert!(Saturator::new(100.0).apply(10.0) <= 1.0);
    }
}
