//! Normalization gain
//!
//! The measuring pass yields an integrated loudness; the processing pass applies
//! one fixed gain that moves it onto the target.

use crate::accumulator::LoudnessMeasurement;
use crate::error::{LoudnessError, Result};

/// Fixed gain applied during the processing pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationGain {
    /// Gain in dB
    pub gain_db: f64,
    /// Linear gain multiplier
    pub linear: f64,
}

impl NormalizationGain {
    /// Gain that leaves the signal unchanged
    pub const UNITY: Self = Self {
        gain_db: 0.0,
        linear: 1.0,
    };

    /// Build from a gain in dB
    pub fn from_db(gain_db: f64) -> Self {
        Self {
            gain_db,
            linear: 10.0_f64.powf(gain_db / 20.0),
        }
    }

    /// Gain that moves `measurement` onto `target_lufs`
    ///
    /// # Errors
    /// Returns `SilentAudio` if the measured loudness is not finite, so a NaN or
    /// infinite gain can never reach the signal
    pub fn compute(target_lufs: f64, measurement: &LoudnessMeasurement) -> Result<Self> {
        if !measurement.integrated_lufs.is_finite() {
            return Err(LoudnessError::SilentAudio);
        }

        let gain = Self::from_db(target_lufs - measurement.integrated_lufs);
        if !gain.linear.is_finite() {
            return Err(LoudnessError::SilentAudio);
        }

        tracing::debug!(
            measured_lufs = measurement.integrated_lufs,
            target_lufs,
            gain_db = gain.gain_db,
            "Computed normalization gain"
        );

        Ok(gain)
    }

    /// Whether applying this gain is a no-op
    pub fn is_unity(&self) -> bool {
        self.linear == 1.0
    }

    /// Multiply interleaved samples in place
    pub fn apply(&self, samples: &mut [f32]) {
        if self.is_unity() {
            return;
        }
        for sample in samples.iter_mut() {
            *sample = (f64::from(*sample) * self.linear) as f32;
        }
    }
}

impl Default for NormalizationGain {
    fn default() -> Self {
        Self::UNITY
    }
}
