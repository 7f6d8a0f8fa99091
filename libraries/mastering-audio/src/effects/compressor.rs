/// Multiband dynamics
///
/// The crossover splits each channel into bands; every band runs its own
/// feed-forward compressor with linked stereo detection, then the bands are
/// summed. With no crossover frequencies the same code is a single full-band
/// compressor.
use super::chain::AudioEffect;
use super::filter_bank::Crossover;
use mastering_core::{BandSettings, MasteringConfig, MasteringError, Result, StreamSpec};

/// Level reported for silence, in dB
const NOISE_FLOOR_DB: f64 = -120.0;

/// Envelope follower state of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeState {
    /// Smoothed detector level in dB
    pub level_db: f64,
    /// Smoothed gain reduction in dB (zero or negative)
    pub gain_reduction_db: f64,
}

impl Default for EnvelopeState {
    fn default() -> Self {
        Self {
            level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
        }
    }
}

/// One band's compressor
#[derive(Debug, Clone)]
pub struct BandCompressor {
    settings: BandSettings,
    attack_coeff: f64,
    release_coeff: f64,
    makeup_db: f64,
    state: EnvelopeState,
}

impl BandCompressor {
    /// Create a band compressor at a sample rate
    pub fn new(settings: BandSettings, sample_rate: u32) -> Self {
        // coeff = exp(-1 / (time_ms * sample_rate / 1000)): 63.2% response at the set time
        let rate = f64::from(sample_rate);
        let attack_samples = settings.attack_ms * rate / 1000.0;
        let release_samples = settings.release_ms * rate / 1000.0;

        Self {
            settings,
            attack_coeff: (-1.0 / attack_samples).exp(),
            release_coeff: (-1.0 / release_samples).exp(),
            makeup_db: settings.makeup_db,
            state: EnvelopeState::default(),
        }
    }

    /// Settings this band was built from
    pub fn settings(&self) -> &BandSettings {
        &self.settings
    }

    /// Current envelope state
    pub fn envelope(&self) -> EnvelopeState {
        self.state
    }

    /// Static gain curve: reduction in dB for a detector level (hard knee)
    #[inline]
    pub fn compute_gain_reduction(&self, level_db: f64) -> f64 {
        if level_db > self.settings.threshold_db {
            (self.settings.threshold_db - level_db) * (1.0 - 1.0 / self.settings.ratio)
        } else {
            0.0
        }
    }

    /// Advance the detector by one frame and return the linear gain to apply
    ///
    /// `peak` is the largest absolute sample of this band across channels.
    #[inline]
    pub fn next_gain(&mut self, peak: f64) -> f64 {
        let level_db = if peak > 1e-6 {
            20.0 * peak.log10()
        } else {
            NOISE_FLOOR_DB
        };

        // Envelope follower: attack when rising, release when falling
        let coeff = if level_db > self.state.level_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.state.level_db = coeff * self.state.level_db + (1.0 - coeff) * level_db;

        // Smooth the gain reduction itself; more reduction is an attack
        let target = self.compute_gain_reduction(self.state.level_db);
        let coeff = if target < self.state.gain_reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.state.gain_reduction_db = coeff * self.state.gain_reduction_db + (1.0 - coeff) * target;

        10.0_f64.powf((self.state.gain_reduction_db + self.makeup_db) / 20.0)
    }

    /// Clear the envelope
    pub fn reset(&mut self) {
        self.state = EnvelopeState::default();
    }
}

/// Crossover-split compressor
pub struct MultibandCompressor {
    crossover: Crossover,
    bands: Vec<BandCompressor>,
    channels: usize,
    /// Band values of the current frame, band-major: `[band * channels + channel]`
    scratch: Vec<f64>,
    /// One channel's split output
    split: Vec<f64>,
}

impl MultibandCompressor {
    /// Create a compressor with `splits_hz.len() + 1` bands
    ///
    /// # Errors
    /// Returns `MasteringError::Config` if the band count does not match the splits
    pub fn new(
        sample_rate: u32,
        channels: usize,
        splits_hz: &[f64],
        bands: &[BandSettings],
    ) -> Result<Self> {
        if bands.len() != splits_hz.len() + 1 {
            return Err(MasteringError::config(format!(
                "{} crossover(s) need {} bands, got {}",
                splits_hz.len(),
                splits_hz.len() + 1,
                bands.len()
            )));
        }
        let channels = channels.max(1);

        Ok(Self {
            crossover: Crossover::new(sample_rate, splits_hz, channels),
            bands: bands
                .iter()
                .map(|&settings| BandCompressor::new(settings, sample_rate))
                .collect(),
            channels,
            scratch: vec![0.0; bands.len() * channels],
            split: vec![0.0; bands.len()],
        })
    }

    /// Full-band compressor
    pub fn single_band(sample_rate: u32, channels: usize, settings: BandSettings) -> Self {
        let channels = channels.max(1);
        Self {
            crossover: Crossover::new(sample_rate, &[], channels),
            bands: vec![BandCompressor::new(settings, sample_rate)],
            channels,
            scratch: vec![0.0; channels],
            split: vec![0.0; 1],
        }
    }

    /// Build the dynamics stage described by `config`
    pub fn from_config(config: &MasteringConfig, spec: &StreamSpec) -> Result<Self> {
        let rate = spec.sample_rate.as_hz();
        let channels = usize::from(spec.channels);
        if config.multiband {
            Self::new(rate, channels, &config.crossovers_hz, &config.bands)
        } else {
            Ok(Self::single_band(rate, channels, config.single_band))
        }
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Envelope of one band
    pub fn envelope(&self, band: usize) -> Option<EnvelopeState> {
        self.bands.get(band).map(BandCompressor::envelope)
    }
}

impl AudioEffect for MultibandCompressor {
    fn process(&mut self, buffer: &mut [f32]) {
        let channels = self.channels;
        for frame in buffer.chunks_exact_mut(channels) {
            for (channel, &sample) in frame.iter().enumerate() {
                self.crossover
                    .split_sample(channel, f64::from(sample), &mut self.split);
                for (band, &value) in self.split.iter().enumerate() {
                    self.scratch[band * channels + channel] = value;
                }
            }

            frame.fill(0.0);
            for (band, compressor) in self.bands.iter_mut().enumerate() {
                let values = &self.scratch[band * channels..(band + 1) * channels];
                let peak = values.iter().fold(0.0_f64, |p, v| p.max(v.abs()));
                let gain = compressor.next_gain(peak);
                for (out, value) in frame.iter_mut().zip(values) {
                    *out += (value * gain) as f32;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.crossover.reset();
        self.bands.iter_mut().for_each(BandCompressor::reset);
    }

    fn name(&self) -> &str {
        if self.bands.len() > 1 {
            "Multiband Compressor"
        } else {
            "Compressor"
        }
    }
}
