//! Lookahead peak limiter
//!
//! Final stage of the processing pass. The signal is delayed by the lookahead
//! so gain reduction can start before a peak arrives; every emitted sample is
//! guaranteed to sit at or below the ceiling.

use mastering_core::LimiterSettings;
use std::collections::VecDeque;

/// Lookahead limiter with latency compensation
///
/// The first `latency_frames()` input frames produce no output. Call
/// [`LookaheadLimiter::flush`] after the last block to drain them, so the
/// total output length equals the total input length.
///
/// # Example
///
/// ```
/// use mastering_core::LimiterSettings;
/// use mastering_loudness::LookaheadLimiter;
///
/// let mut limiter = LookaheadLimiter::new(44_100, 2, &LimiterSettings::default());
/// let input = vec![1.5_f32; 2 * 4410];
/// let mut output = Vec::new();
/// limiter.process(&input, &mut output);
/// limiter.flush(&mut output);
/// assert_eq!(output.len(), input.len());
/// assert!(output.iter().all(|s| s.abs() <= 0.9661));
/// ```
pub struct LookaheadLimiter {
    /// Ceiling in linear amplitude
    ceiling: f64,
    /// Number of interleaved channels
    channels: usize,
    /// Delay in frames (>= 1)
    lookahead: usize,
    /// Attack smoothing coefficient (time constant = lookahead / 5)
    attack_coeff: f64,
    /// Release smoothing coefficient
    release_coeff: f64,
    /// Delayed samples, interleaved
    delay: VecDeque<f32>,
    /// Required gain of each delayed frame
    required: VecDeque<f64>,
    /// Monotonic deque of (frame index, required gain); front is the window minimum
    window: VecDeque<(u64, f64)>,
    /// Current smoothed gain (linear, 0.0-1.0)
    gain: f64,
    /// Frames accepted so far
    frames_in: u64,
    /// Frames emitted so far
    frames_out: u64,
    /// Lowest gain applied so far
    min_applied_gain: f64,
}

impl LookaheadLimiter {
    /// Create a limiter for a stream shape
    pub fn new(sample_rate: u32, channels: usize, settings: &LimiterSettings) -> Self {
        let rate = f64::from(sample_rate);
        let lookahead = ((settings.lookahead_ms * rate / 1000.0).round() as usize).max(1);
        let attack_frames = (lookahead as f64 / 5.0).max(1.0);
        let release_frames = (settings.release_ms * rate / 1000.0).max(1.0);
        let channels = channels.max(1);

        Self {
            ceiling: settings.ceiling_linear(),
            channels,
            lookahead,
            attack_coeff: (-1.0 / attack_frames).exp(),
            release_coeff: (-1.0 / release_frames).exp(),
            delay: VecDeque::with_capacity((lookahead + 1) * channels),
            required: VecDeque::with_capacity(lookahead + 1),
            window: VecDeque::with_capacity(lookahead + 1),
            gain: 1.0,
            frames_in: 0,
            frames_out: 0,
            min_applied_gain: 1.0,
        }
    }

    /// Output delay in frames
    pub fn latency_frames(&self) -> usize {
        self.lookahead
    }

    /// Ceiling in linear amplitude
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Largest gain reduction applied so far, in dB (positive)
    pub fn max_reduction_db(&self) -> f64 {
        -20.0 * self.min_applied_gain.log10()
    }

    /// Limit interleaved samples, appending whatever leaves the delay line to `output`
    ///
    /// A trailing partial frame is ignored.
    pub fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.reserve(input.len());
        for frame in input.chunks_exact(self.channels) {
            self.push_frame(frame, output);
        }
    }

    /// Drain the delay line at end of stream
    pub fn flush(&mut self, output: &mut Vec<f32>) {
        output.reserve(self.delay.len());
        while !self.required.is_empty() {
            self.emit(output);
        }
    }

    /// Clear all state, as if newly constructed
    pub fn reset(&mut self) {
        self.delay.clear();
        self.required.clear();
        self.window.clear();
        self.gain = 1.0;
        self.frames_in = 0;
        self.frames_out = 0;
        self.min_applied_gain = 1.0;
    }

    /// Gain that brings `frame` under the ceiling; 0 silences a non-finite frame
    fn required_gain(&self, frame: &[f32]) -> f64 {
        let mut peak = 0.0_f64;
        for sample in frame {
            if !sample.is_finite() {
                return 0.0;
            }
            peak = peak.max(f64::from(sample.abs()));
        }
        if peak > self.ceiling {
            self.ceiling / peak
        } else {
            1.0
        }
    }

    fn push_frame(&mut self, frame: &[f32], output: &mut Vec<f32>) {
        let required = self.required_gain(frame);
        let index = self.frames_in;
        self.frames_in += 1;

        self.delay.extend(frame.iter().copied());
        self.required.push_back(required);

        while self.window.back().is_some_and(|&(_, gain)| gain >= required) {
            self.window.pop_back();
        }
        self.window.push_back((index, required));

        if self.required.len() > self.lookahead {
            self.emit(output);
        }
    }

    fn emit(&mut self, output: &mut Vec<f32>) {
        // Window spans the outgoing frame and everything still queued behind it
        while self
            .window
            .front()
            .is_some_and(|&(index, _)| index < self.frames_out)
        {
            self.window.pop_front();
        }
        let target = self.window.front().map_or(1.0, |&(_, gain)| gain);

        let coeff = if target < self.gain {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.gain = target + (self.gain - target) * coeff;

        let Some(required) = self.required.pop_front() else {
            return;
        };
        let applied = self.gain.min(required);
        self.min_applied_gain = self.min_applied_gain.min(applied);

        for _ in 0..self.channels {
            if let Some(sample) = self.delay.pop_front() {
                let limited = f64::from(sample) * applied;
                output.push(if limited.is_finite() { limited as f32 } else { 0.0 });
            }
        }
        self.frames_out += 1;
    }
}
