//! Filter bank
//!
//! Second-order IIR sections (RBJ audio-EQ cookbook) used for the four-band
//! equalizer, the exciter's high-pass, and the Linkwitz-Riley crossover that
//! feeds the multiband compressor.
//!
//! Coefficients and delay lines are `f64`; samples enter and leave as `f32`.
//! Every filter keeps one [`FilterState`] per channel, so feeding a stream as
//! one block or as many consecutive blocks produces the same output.

use super::chain::AudioEffect;
use mastering_core::{EqSettings, StreamSpec};
use std::f64::consts::PI;

/// Butterworth Q for a second-order section
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Q used for the shelving bands
pub const SHELF_Q: f64 = 0.707;

/// Q used for the peaking bands
pub const PEAK_Q: f64 = 1.0;

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

/// Angular frequency terms shared by every cookbook formula
struct Omega {
    sin: f64,
    cos: f64,
}

impl Omega {
    fn new(sample_rate: f64, frequency: f64) -> Self {
        // Clamp to 45% of the sample rate to keep the sections stable near Nyquist
        let clamped = frequency.min(sample_rate * 0.45);
        let omega = 2.0 * PI * clamped / sample_rate;
        Self {
            sin: omega.sin(),
            cos: omega.cos(),
        }
    }
}

impl BiquadCoefficients {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Peaking EQ
    pub fn peaking(sample_rate: u32, frequency: f64, q: f64, gain_db: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let w = Omega::new(f64::from(sample_rate), frequency);
        let alpha = w.sin / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * w.cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * w.cos,
            1.0 - alpha / a,
        )
    }

    /// Low shelf
    pub fn low_shelf(sample_rate: u32, frequency: f64, q: f64, gain_db: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let w = Omega::new(f64::from(sample_rate), frequency);
        let alpha = w.sin / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
        let beta = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * w.cos + beta),
            2.0 * a * ((a - 1.0) - (a + 1.0) * w.cos),
            a * ((a + 1.0) - (a - 1.0) * w.cos - beta),
            (a + 1.0) + (a - 1.0) * w.cos + beta,
            -2.0 * ((a - 1.0) + (a + 1.0) * w.cos),
            (a + 1.0) + (a - 1.0) * w.cos - beta,
        )
    }

    /// High shelf
    pub fn high_shelf(sample_rate: u32, frequency: f64, q: f64, gain_db: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let w = Omega::new(f64::from(sample_rate), frequency);
        let alpha = w.sin / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
        let beta = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * w.cos + beta),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * w.cos),
            a * ((a + 1.0) + (a - 1.0) * w.cos - beta),
            (a + 1.0) - (a - 1.0) * w.cos + beta,
            2.0 * ((a - 1.0) - (a + 1.0) * w.cos),
            (a + 1.0) - (a - 1.0) * w.cos - beta,
        )
    }

    /// Second-order low-pass
    pub fn low_pass(sample_rate: u32, frequency: f64, q: f64) -> Self {
        let w = Omega::new(f64::from(sample_rate), frequency);
        let alpha = w.sin / (2.0 * q);

        Self::normalized(
            (1.0 - w.cos) / 2.0,
            1.0 - w.cos,
            (1.0 - w.cos) / 2.0,
            1.0 + alpha,
            -2.0 * w.cos,
            1.0 - alpha,
        )
    }

    /// Second-order high-pass
    pub fn high_pass(sample_rate: u32, frequency: f64, q: f64) -> Self {
        let w = Omega::new(f64::from(sample_rate), frequency);
        let alpha = w.sin / (2.0 * q);

        Self::normalized(
            (1.0 + w.cos) / 2.0,
            -(1.0 + w.cos),
            (1.0 + w.cos) / 2.0,
            1.0 + alpha,
            -2.0 * w.cos,
            1.0 - alpha,
        )
    }
}

/// Delay line of one section on one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl FilterState {
    /// Advance by one sample (direct form I)
    #[inline]
    pub fn tick(&mut self, c: &BiquadCoefficients, x: f64) -> f64 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Clear the delay line
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One biquad section with per-channel state
#[derive(Debug, Clone)]
pub struct Biquad {
    coefficients: BiquadCoefficients,
    states: Vec<FilterState>,
}

impl Biquad {
    /// Create a section for `channels` interleaved channels
    pub fn new(coefficients: BiquadCoefficients, channels: usize) -> Self {
        Self {
            coefficients,
            states: vec![FilterState::default(); channels.max(1)],
        }
    }

    /// Coefficients of this section
    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coefficients
    }

    /// Filter one sample of one channel
    #[inline]
    pub fn tick(&mut self, channel: usize, x: f64) -> f64 {
        self.states[channel].tick(&self.coefficients, x)
    }

    /// Filter an interleaved buffer in place
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let channels = self.states.len();
        for frame in buffer.chunks_exact_mut(channels) {
            for (sample, state) in frame.iter_mut().zip(self.states.iter_mut()) {
                *sample = state.tick(&self.coefficients, f64::from(*sample)) as f32;
            }
        }
    }

    /// Clear every channel's delay line
    pub fn reset(&mut self) {
        self.states.iter_mut().for_each(FilterState::reset);
    }
}

/// Equalizer band shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandShape {
    /// Boosts/cuts below frequency
    LowShelf,
    /// Boosts/cuts around frequency with Q bandwidth
    Peaking,
    /// Boosts/cuts above frequency
    HighShelf,
}

/// One equalizer band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBand {
    pub name: &'static str,
    pub shape: BandShape,
    pub frequency: f64,
    pub q: f64,
    pub gain_db: f64,
}

impl EqBand {
    /// Coefficients for this band at a sample rate
    pub fn coefficients(&self, sample_rate: u32) -> BiquadCoefficients {
        match self.shape {
            BandShape::LowShelf => {
                BiquadCoefficients::low_shelf(sample_rate, self.frequency, self.q, self.gain_db)
            }
            BandShape::Peaking => {
                BiquadCoefficients::peaking(sample_rate, self.frequency, self.q, self.gain_db)
            }
            BandShape::HighShelf => {
                BiquadCoefficients::high_shelf(sample_rate, self.frequency, self.q, self.gain_db)
            }
        }
    }
}

/// Fixed four-band mastering EQ layout
pub fn eq_bands(settings: &EqSettings) -> [EqBand; 4] {
    [
        EqBand {
            name: "bass",
            shape: BandShape::LowShelf,
            frequency: 250.0,
            q: SHELF_Q,
            gain_db: settings.bass_db,
        },
        EqBand {
            name: "mid",
            shape: BandShape::Peaking,
            frequency: 1000.0,
            q: PEAK_Q,
            gain_db: settings.mid_db,
        },
        EqBand {
            name: "presence",
            shape: BandShape::Peaking,
            frequency: 4000.0,
            q: PEAK_Q,
            gain_db: settings.presence_db,
        },
        EqBand {
            name: "treble",
            shape: BandShape::HighShelf,
            frequency: 8000.0,
            q: SHELF_Q,
            gain_db: settings.treble_db,
        },
    ]
}

/// Four-band equalizer
///
/// Bands at 0 dB are left out, so a flat EQ holds no filters at all.
pub struct Equalizer {
    filters: Vec<Biquad>,
}

impl Equalizer {
    /// Build the active bands for a stream
    pub fn new(settings: &EqSettings, spec: &StreamSpec) -> Self {
        let channels = usize::from(spec.channels);
        let filters = eq_bands(settings)
            .iter()
            .filter(|band| band.gain_db != 0.0)
            .map(|band| Biquad::new(band.coefficients(spec.sample_rate.as_hz()), channels))
            .collect();
        Self { filters }
    }

    /// Number of active bands
    pub fn active_bands(&self) -> usize {
        self.filters.len()
    }
}

impl AudioEffect for Equalizer {
    fn process(&mut self, buffer: &mut [f32]) {
        for filter in &mut self.filters {
            filter.process_interleaved(buffer);
        }
    }

    fn reset(&mut self) {
        self.filters.iter_mut().for_each(Biquad::reset);
    }

    fn name(&self) -> &str {
        "Equalizer"
    }
}

/// Fourth-order Linkwitz-Riley low-pass: two cascaded Butterworth sections
#[derive(Debug, Clone)]
struct LinkwitzRiley {
    first: Biquad,
    second: Biquad,
}

impl LinkwitzRiley {
    fn low_pass(sample_rate: u32, frequency: f64, channels: usize) -> Self {
        let coefficients = BiquadCoefficients::low_pass(sample_rate, frequency, BUTTERWORTH_Q);
        Self {
            first: Biquad::new(coefficients, channels),
            second: Biquad::new(coefficients, channels),
        }
    }

    #[inline]
    fn tick(&mut self, channel: usize, x: f64) -> f64 {
        let y = self.first.tick(channel, x);
        self.second.tick(channel, y)
    }

    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }
}

/// Complementary crossover
///
/// For splits f1 < f2 < ..., band 0 is LR4 low-pass(f1) of the input, band k
/// is LR4 low-pass(f(k+1)) of what the lower bands left over, and the last band
/// is the final remainder. The bands therefore sum back to the input up to
/// floating-point rounding.
#[derive(Debug, Clone)]
pub struct Crossover {
    sections: Vec<LinkwitzRiley>,
    channels: usize,
}

impl Crossover {
    /// Create a crossover with the given split frequencies (strictly increasing)
    pub fn new(sample_rate: u32, splits_hz: &[f64], channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            sections: splits_hz
                .iter()
                .map(|&f| LinkwitzRiley::low_pass(sample_rate, f, channels))
                .collect(),
            channels,
        }
    }

    /// Number of output bands
    pub fn band_count(&self) -> usize {
        self.sections.len() + 1
    }

    /// Split one sample of one channel into `bands` (length `band_count()`)
    #[inline]
    pub fn split_sample(&mut self, channel: usize, x: f64, bands: &mut [f64]) {
        let mut remainder = x;
        for (section, band) in self.sections.iter_mut().zip(bands.iter_mut()) {
            let low = section.tick(channel, remainder);
            *band = low;
            remainder -= low;
        }
        if let Some(last) = bands.get_mut(self.sections.len()) {
            *last = remainder;
        }
    }

    /// Split an interleaved buffer into one interleaved buffer per band
    pub fn split(&mut self, buffer: &[f32]) -> Vec<Vec<f32>> {
        let count = self.band_count();
        let mut outputs = vec![Vec::with_capacity(buffer.len()); count];
        let mut bands = vec![0.0; count];

        for frame in buffer.chunks_exact(self.channels) {
            for (channel, &sample) in frame.iter().enumerate() {
                self.split_sample(channel, f64::from(sample), &mut bands);
                for (output, &value) in outputs.iter_mut().zip(&bands) {
                    output.push(value as f32);
                }
            }
        }

        outputs
    }

    /// Clear all section state
    pub fn reset(&mut self) {
        self.sections.iter_mut().for_each(LinkwitzRiley::reset);
    }
}
