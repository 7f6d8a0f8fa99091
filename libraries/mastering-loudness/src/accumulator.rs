//! EBU R128 loudness accumulation
//!
//! Wraps the ebur128 crate, which holds the K-weighting filter state and the
//! 400 ms / 75 % overlap block energies. Gating (-70 LUFS absolute, -10 LU
//! relative) happens when the accumulator is finalized.

use crate::error::{LoudnessError, Result};
use ebur128::{EbuR128, Mode};
use std::fmt;

/// Result of a finished loudness measurement
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessMeasurement {
    /// Gated integrated loudness in LUFS
    pub integrated_lufs: f64,

    /// Loudness range in LU
    pub loudness_range_lu: f64,

    /// Maximum sample value over all channels, in dBFS
    pub sample_peak_dbfs: f64,

    /// Duration of the measured audio in seconds
    pub duration_seconds: f64,

    /// Sample rate of the measured audio
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u32,
}

impl fmt::Display for LoudnessMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loudness: {:.1} LUFS, Range: {:.1} LU, Sample Peak: {:.1} dBFS",
            self.integrated_lufs, self.loudness_range_lu, self.sample_peak_dbfs
        )
    }
}

/// Streaming integrated-loudness accumulator
///
/// Created at the start of the measuring pass, fed every processed block in
/// order, and consumed once by [`LoudnessAccumulator::finalize`].
///
/// # Example
///
/// ```
/// use mastering_loudness::LoudnessAccumulator;
///
/// let mut accumulator = LoudnessAccumulator::new(48_000, 2)?;
/// let tone: Vec<f32> = (0..48_000 * 3)
///     .flat_map(|i| {
///         let s = 0.1 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48_000.0).sin();
///         [s, s]
///     })
///     .collect();
/// accumulator.add_frames(&tone)?;
/// let measurement = accumulator.finalize()?;
/// assert!(measurement.integrated_lufs < -15.0);
/// # Ok::<(), mastering_loudness::LoudnessError>(())
/// ```
pub struct LoudnessAccumulator {
    ebur128: EbuR128,
    sample_rate: u32,
    channels: u32,
    frames: u64,
}

impl LoudnessAccumulator {
    /// Create an accumulator for a stream shape
    ///
    /// # Errors
    /// Returns error if sample rate or channel count is out of range
    pub fn new(sample_rate: u32, channels: u32) -> Result<Self> {
        if !(8000..=384_000).contains(&sample_rate) {
            return Err(LoudnessError::InvalidSampleRate(sample_rate));
        }
        if !(1..=2).contains(&channels) {
            return Err(LoudnessError::InvalidChannelCount(channels));
        }

        let mode = Mode::I | Mode::LRA | Mode::SAMPLE_PEAK;
        let ebur128 = EbuR128::new(channels, sample_rate, mode)?;

        Ok(Self {
            ebur128,
            sample_rate,
            channels,
            frames: 0,
        })
    }

    /// Feed interleaved samples
    ///
    /// Length must be divisible by the channel count.
    pub fn add_frames(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        if samples.len() % self.channels as usize != 0 {
            return Err(LoudnessError::AnalysisError(format!(
                "Sample count {} is not divisible by channel count {}",
                samples.len(),
                self.channels
            )));
        }

        self.ebur128.add_frames_f32(samples)?;
        self.frames += (samples.len() / self.channels as usize) as u64;

        Ok(())
    }

    /// Frames accumulated so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Finish the measurement
    ///
    /// # Errors
    /// `NoSamples` if nothing was fed, `SilentAudio` if every gating block was
    /// gated out (ebur128 reports negative infinity)
    pub fn finalize(self) -> Result<LoudnessMeasurement> {
        if self.frames == 0 {
            return Err(LoudnessError::NoSamples);
        }

        let integrated_lufs = self.ebur128.loudness_global()?;
        if !integrated_lufs.is_finite() {
            return Err(LoudnessError::SilentAudio);
        }

        let loudness_range_lu = self.ebur128.loudness_range().unwrap_or(0.0);

        let sample_peak = (0..self.channels)
            .map(|ch| self.ebur128.sample_peak(ch).unwrap_or(0.0))
            .fold(0.0_f64, f64::max);
        let sample_peak_dbfs = if sample_peak > 0.0 {
            20.0 * sample_peak.log10()
        } else {
            f64::NEG_INFINITY
        };

        Ok(LoudnessMeasurement {
            integrated_lufs,
            loudness_range_lu,
            sample_peak_dbfs,
            duration_seconds: self.frames as f64 / f64::from(self.sample_rate),
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}

/// Measure a complete interleaved buffer in one call
pub fn measure(samples: &[f32], sample_rate: u32, channels: u32) -> Result<LoudnessMeasurement> {
    let mut accumulator = LoudnessAccumulator::new(sample_rate, channels)?;
    accumulator.add_frames(samples)?;
    accumulator.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: u32, amplitude: f32, seconds: f32) -> Vec<f32> {
        let frames = (sample_rate as f32 * seconds) as usize;
        (0..frames)
            .flat_map(|i| {
                let t = i as f32 / sample_rate as f32;
                let s = amplitude * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
                [s, s]
            })
            .collect()
    }

    #[test]
    fn rejects_unsupported_shapes() {
        assert!(LoudnessAccumulator::new(44_100, 2).is_ok());
        assert!(LoudnessAccumulator::new(48_000, 1).is_ok());
        assert!(matches!(
            LoudnessAccumulator::new(100, 2),
            Err(LoudnessError::InvalidSampleRate(100))
        ));
        assert!(matches!(
            LoudnessAccumulator::new(44_100, 6),
            Err(LoudnessError::InvalidChannelCount(6))
        ));
    }

    #[test]
    fn silence_is_gated_out() {
        let result = measure(&vec![0.0; 44_100 * 2], 44_100, 2);
        assert!(matches!(result, Err(LoudnessError::SilentAudio)));
    }

    #[test]
    fn empty_input_has_no_samples() {
        let accumulator = LoudnessAccumulator::new(44_100, 2).unwrap();
        assert!(matches!(accumulator.finalize(), Err(LoudnessError::NoSamples)));
    }

    #[test]
    fn ragged_input_rejected() {
        let mut accumulator = LoudnessAccumulator::new(44_100, 2).unwrap();
        assert!(accumulator.add_frames(&[0.1; 5]).is_err());
    }

    #[test]
    fn stereo_sine_reference_level() {
        // A 0 dBFS 1 kHz sine in both channels reads 0 LUFS
        let measurement = measure(&sine(48_000, 0.1, 3.0), 48_000, 2).unwrap();
        assert!(
            (measurement.integrated_lufs + 20.0).abs() < 0.5,
            "got {:.2} LUFS",
            measurement.integrated_lufs
        );
        assert!((measurement.sample_peak_dbfs + 20.0).abs() < 0.1);
        assert!((measurement.duration_seconds - 3.0).abs() < 1e-9);
    }

    #[test]
    fn chunked_feed_matches_single_feed() {
        let samples = sine(44_100, 0.3, 2.0);
        let whole = measure(&samples, 44_100, 2).unwrap();

        let mut accumulator = LoudnessAccumulator::new(44_100, 2).unwrap();
        for chunk in samples.chunks(2 * 1000) {
            accumulator.add_frames(chunk).unwrap();
        }
        let chunked = accumulator.finalize().unwrap();

        assert!((whole.integrated_lufs - chunked.integrated_lufs).abs() < 1e-6);
    }
}
