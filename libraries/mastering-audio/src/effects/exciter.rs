/// Harmonic exciter
///
/// A 3 kHz high-passed copy of the signal is driven into tanh and mixed back
/// over the dry signal. The only state is the high-pass delay line.
use super::chain::AudioEffect;
use super::filter_bank::{Biquad, BiquadCoefficients, BUTTERWORTH_Q};
use mastering_core::StreamSpec;

/// High-pass corner feeding the saturator
pub const EXCITER_CORNER_HZ: f64 = 3000.0;

/// High-frequency exciter
pub struct Exciter {
    high_pass: Biquad,
    channels: usize,
    pre_gain: f64,
    wet: f64,
}

impl Exciter {
    /// Create an exciter with `drive` in 0..=1
    pub fn new(drive: f64, spec: &StreamSpec) -> Self {
        let channels = usize::from(spec.channels).max(1);
        let coefficients = BiquadCoefficients::high_pass(
            spec.sample_rate.as_hz(),
            EXCITER_CORNER_HZ,
            BUTTERWORTH_Q,
        );
        Self {
            high_pass: Biquad::new(coefficients, channels),
            channels,
            pre_gain: 1.0 + 9.0 * drive,
            wet: drive * 0.5,
        }
    }
}

impl AudioEffect for Exciter {
    fn process(&mut self, buffer: &mut [f32]) {
        for frame in buffer.chunks_exact_mut(self.channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                let dry = f64::from(*sample);
                let high = self.high_pass.tick(channel, dry);
                *sample = (dry + self.wet * (high * self.pre_gain).tanh()) as f32;
            }
        }
    }

    fn reset(&mut self) {
        self.high_pass.reset();
    }

    fn name(&self) -> &str {
        "Exciter"
    }
}
