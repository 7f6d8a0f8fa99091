//! Level analysis for verification

/// Calculate RMS (Root Mean Square) level
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Absolute maximum sample value
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Convert linear amplitude to dB
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -100.0 // Silence
    } else {
        20.0 * linear.log10()
    }
}

/// Convert dB to linear amplitude
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Largest sample-wise difference between two buffers
///
/// Buffers of different length compare as infinitely different.
pub fn max_abs_difference(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max)
}

/// Split interleaved stereo into (left, right)
pub fn split_stereo(samples: &[f32]) -> (Vec<f32>, Vec<f32>) {
    samples
        .chunks_exact(2)
        .map(|frame| (frame[0], frame[1]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_square() {
        assert!((calculate_rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-7);
        assert_eq!(calculate_rms(&[]), 0.0);
    }

    #[test]
    fn db_conversions() {
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert_eq!(linear_to_db(0.0), -100.0);
    }

    #[test]
    fn difference_and_split() {
        assert_eq!(max_abs_difference(&[0.0, 1.0], &[0.25, 1.0]), 0.25);
        assert!(max_abs_difference(&[0.0], &[]).is_infinite());
        let (l, r) = split_stereo(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(l, vec![1.0, 3.0]);
        assert_eq!(r, vec![2.0, 4.0]);
    }
}
