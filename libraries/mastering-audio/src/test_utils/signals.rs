//! Test signal generation
//!
//! All generators return stereo interleaved samples (L, R, L, R, ...).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Generate a sine wave
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `duration` - Duration in seconds
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn generate_sine_wave(
    frequency: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_frames = frame_count(sample_rate, duration);
    let mut samples = Vec::with_capacity(num_frames * 2);

    for i in 0..num_frames {
        let t = i as f64 / f64::from(sample_rate);
        let sample = ((2.0 * PI * f64::from(frequency) * t).sin() * f64::from(amplitude)) as f32;
        samples.push(sample); // Left
        samples.push(sample); // Right
    }

    samples
}

/// Generate a logarithmic sine sweep (chirp)
///
/// Phase is accumulated in f64 so long sweeps stay clean.
pub fn generate_sine_sweep(
    start_freq: f32,
    end_freq: f32,
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
) -> Vec<f32> {
    let num_frames = frame_count(sample_rate, duration);
    let mut samples = Vec::with_capacity(num_frames * 2);

    let start = f64::from(start_freq);
    let k = (f64::from(end_freq) / start).ln() / f64::from(duration);

    for i in 0..num_frames {
        let t = i as f64 / f64::from(sample_rate);
        let phase = 2.0 * PI * start * ((k * t).exp() - 1.0) / k;
        let sample = (phase.sin() * f64::from(amplitude)) as f32;
        samples.push(sample);
        samples.push(sample);
    }

    samples
}

/// Generate white noise from a fixed seed
///
/// Left and right are independent, so the result is fully decorrelated.
pub fn generate_white_noise(sample_rate: u32, duration: f32, amplitude: f32, seed: u64) -> Vec<f32> {
    let num_frames = frame_count(sample_rate, duration);
    let mut rng = StdRng::seed_from_u64(seed);

    (0..num_frames * 2)
        .map(|_| rng.gen_range(-1.0_f32..=1.0) * amplitude)
        .collect()
}

/// Alternate quiet and loud sine sections every `section` seconds
///
/// Useful for exercising compressor attack and release.
pub fn generate_dynamic_test_signal(
    sample_rate: u32,
    duration: f32,
    section: f32,
    quiet_amplitude: f32,
    loud_amplitude: f32,
) -> Vec<f32> {
    let section_frames = frame_count(sample_rate, section).max(1);
    let mut samples = generate_sine_wave(440.0, sample_rate, duration, 1.0);

    for (index, frame) in samples.chunks_exact_mut(2).enumerate() {
        let amplitude = if (index / section_frames) % 2 == 0 {
            quiet_amplitude
        } else {
            loud_amplitude
        };
        frame.iter_mut().for_each(|s| *s *= amplitude);
    }

    samples
}

/// Generate digital silence
pub fn generate_silence(sample_rate: u32, duration: f32) -> Vec<f32> {
    vec![0.0; frame_count(sample_rate, duration) * 2]
}

fn frame_count(sample_rate: u32, duration: f32) -> usize {
    (f64::from(sample_rate) * f64::from(duration)).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_has_expected_shape() {
        let samples = generate_sine_wave(1000.0, 48_000, 0.5, 0.5);
        assert_eq!(samples.len(), 48_000);
        let peak = samples.iter().fold(0.0_f32, |p, s| p.max(s.abs()));
        assert!((peak - 0.5).abs() < 1e-3);
    }

    #[test]
    fn noise_is_reproducible() {
        assert_eq!(
            generate_white_noise(8000, 0.1, 0.5, 7),
            generate_white_noise(8000, 0.1, 0.5, 7)
        );
    }

    #[test]
    fn sweep_length() {
        let samples = generate_sine_sweep(20.0, 20_000.0, 44_100, 2.0, 0.5);
        assert_eq!(samples.len(), 2 * 88_200);
    }
}
