//! Stereo width
//!
//! Mid/side processing: `M = (L+R)/2`, `S = (L-R)/2`, `S *= width`, then back
//! to left/right. Mono streams pass through untouched.

use super::chain::AudioEffect;
use mastering_core::{MasteringError, Result};

/// Lowest accepted width (mono)
pub const MIN_WIDTH: f64 = 0.0;

/// Highest accepted width; beyond this the side channel dominates and phase inverts on mono fold-down
pub const MAX_WIDTH: f64 = 2.0;

/// Mid/side stereo widener
#[derive(Debug, Clone, Copy)]
pub struct StereoWidener {
    width: f64,
    channels: usize,
}

impl StereoWidener {
    /// Create a widener (0.0 = mono, 1.0 = normal, 2.0 = extra wide)
    ///
    /// # Errors
    /// Returns `MasteringError::Config` for widths outside 0.0..=2.0 or non-finite values
    pub fn new(width: f64, channels: usize) -> Result<Self> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
            return Err(MasteringError::config(format!(
                "stereo width {width} outside {MIN_WIDTH}..={MAX_WIDTH}"
            )));
        }
        Ok(Self { width, channels })
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.width
    }
}

impl AudioEffect for StereoWidener {
    fn process(&mut self, buffer: &mut [f32]) {
        if self.channels != 2 {
            return;
        }
        for frame in buffer.chunks_exact_mut(2) {
            let left = f64::from(frame[0]);
            let right = f64::from(frame[1]);
            let mid = (left + right) * 0.5;
            let side = (left - right) * 0.5 * self.width;
            frame[0] = (mid + side) as f32;
            frame[1] = (mid - side) as f32;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Stereo Widener"
    }
}

/// Correlation between left and right (1.0 = mono, 0.0 = uncorrelated, -1.0 = inverted)
pub fn channel_correlation(buffer: &[f32]) -> f64 {
    let (mut sum_ll, mut sum_rr, mut sum_lr) = (0.0_f64, 0.0_f64, 0.0_f64);
    for frame in buffer.chunks_exact(2) {
        let l = f64::from(frame[0]);
        let r = f64::from(frame[1]);
        sum_ll += l * l;
        sum_rr += r * r;
        sum_lr += l * r;
    }
    let denominator = (sum_ll * sum_rr).sqrt();
    if denominator > 0.0 {
        sum_lr / denominator
    } else {
        1.0
    }
}
