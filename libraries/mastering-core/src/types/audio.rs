/// Audio-related types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);
    pub const HIGH_RES_96: Self = Self(96_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }

    /// Number of frames covering `seconds` of audio, rounded to the nearest frame
    pub fn frames_for(&self, seconds: f64) -> usize {
        (seconds * f64::from(self.0)).round() as usize
    }
}

/// Shape of a decoded stream, as reported by a `SampleSource`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    /// Sample rate shared by every block of the stream
    pub sample_rate: SampleRate,

    /// Number of interleaved channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Total length in frames, when the container reports it
    pub total_frames: Option<u64>,
}

impl StreamSpec {
    /// Highest channel count the chain processes
    pub const MAX_CHANNELS: u16 = 2;

    /// Create a spec with unknown length
    pub fn new(sample_rate: SampleRate, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            total_frames: None,
        }
    }

    /// Attach a known total length
    #[must_use]
    pub fn with_total_frames(mut self, total_frames: u64) -> Self {
        self.total_frames = Some(total_frames);
        self
    }

    /// Stereo spec at the given rate
    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(SampleRate::new(sample_rate), 2)
    }

    /// Number of blocks a stream of this length splits into for a given block size
    ///
    /// Returns `None` when the total length is unknown.
    pub fn block_count(&self, block_frames: usize) -> Option<u64> {
        let block_frames = block_frames.max(1) as u64;
        self.total_frames
            .map(|total| total.div_ceil(block_frames))
    }

    /// Duration in seconds, when the total length is known
    pub fn duration_secs(&self) -> Option<f64> {
        self.total_frames
            .map(|frames| frames as f64 / f64::from(self.sample_rate.as_hz()))
    }
}

/// A contiguous run of interleaved samples from one stream
///
/// Samples are stored as f32, nominally in [-1.0, 1.0] before final limiting.
/// Interleaved format: [L, R, L, R, ...] for stereo.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Audio samples (f32, interleaved)
    pub samples: Vec<f32>,

    /// Number of interleaved channels
    pub channels: u16,

    /// Sample rate of the stream this block belongs to
    pub sample_rate: SampleRate,

    /// Position of the first frame of this block within the stream
    pub start_frame: u64,
}

impl AudioBlock {
    /// Create a new block
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: SampleRate, start_frame: u64) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            start_frame,
        }
    }

    /// Create a block shaped like `spec`
    pub fn for_stream(samples: Vec<f32>, spec: &StreamSpec, start_frame: u64) -> Self {
        Self::new(samples, spec.channels, spec.sample_rate, start_frame)
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Frame position just past the end of this block
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.frames() as u64
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate.as_hz())
    }

    /// Check if the block is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }

    /// Whether the block has the rate and layout of `spec`
    pub fn matches(&self, spec: &StreamSpec) -> bool {
        self.channels == spec.channels
            && self.sample_rate == spec.sample_rate
            && self.samples.len() % self.channels.max(1) as usize == 0
    }
}

/// Replace NaN and infinite samples with silence
///
/// Returns how many samples were replaced. Sources call this on decoded data so
/// nothing downstream ever sees a non-finite value.
pub fn sanitize_samples(samples: &mut [f32]) -> usize {
    let mut replaced = 0;
    for sample in samples.iter_mut().filter(|s| !s.is_finite()) {
        *sample = 0.0;
        replaced += 1;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_non_finite_samples() {
        let mut samples = [0.5, f32::NAN, -1.5, f32::INFINITY, f32::NEG_INFINITY];
        assert_eq!(sanitize_samples(&mut samples), 3);
        assert_eq!(samples, [0.5, 0.0, -1.5, 0.0, 0.0]);

        let mut clean = [0.1_f32, -0.2];
        assert_eq!(sanitize_samples(&mut clean), 0);
    }

    #[test]
    fn frames_for_rounds_to_nearest() {
        let rate = SampleRate::CD_QUALITY;
        assert_eq!(rate.frames_for(30.0), 1_323_000);
        assert_eq!(rate.frames_for(0.005), 221);
    }

    #[test]
    fn block_count_includes_short_tail() {
        let spec = StreamSpec::stereo(44_100).with_total_frames(44_100 * 90);
        assert_eq!(spec.block_count(44_100 * 30), Some(3));

        let spec = StreamSpec::stereo(44_100).with_total_frames(44_100 * 90 + 1);
        assert_eq!(spec.block_count(44_100 * 30), Some(4));

        assert_eq!(StreamSpec::stereo(44_100).block_count(1024), None);
    }

    #[test]
    fn block_frames_and_end() {
        let spec = StreamSpec::stereo(48_000);
        let block = AudioBlock::for_stream(vec![0.0; 8], &spec, 100);
        assert_eq!(block.frames(), 4);
        assert_eq!(block.end_frame(), 104);
        assert!(block.matches(&spec));
        assert!(!block.matches(&StreamSpec::new(SampleRate::new(48_000), 1)));
    }

    #[test]
    fn block_peak() {
        let spec = StreamSpec::stereo(44_100);
        let block = AudioBlock::for_stream(vec![0.1, -0.7, 0.3, 0.2], &spec, 0);
        assert!((block.peak() - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn block_duration() {
        let spec = StreamSpec::stereo(44_100);
        let block = AudioBlock::for_stream(vec![0.0; 88_200], &spec, 0);
        assert!((block.duration_secs() - 1.0).abs() < 1e-9);
    }
}
