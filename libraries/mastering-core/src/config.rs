/// Mastering configuration
///
/// `MasteringConfig` is built once before processing (presets populate its EQ first),
/// validated when the pipeline is constructed, and never mutated during a run.
use crate::error::{MasteringError, Result};
use serde::{Deserialize, Serialize};

/// Hard limit for any EQ band gain, in dB
pub const MAX_EQ_GAIN_DB: f64 = 24.0;

/// Lowest accepted compressor threshold, in dB
pub const MIN_THRESHOLD_DB: f64 = -90.0;

/// Longest accepted chunk, in seconds
pub const MAX_CHUNK_SECONDS: f64 = 600.0;

/// Complete parameter set for one mastering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteringConfig {
    /// Four-band equalizer gains
    pub eq: EqSettings,

    /// Enable the dynamics stage
    ///
    /// Compression runs when either `compress` or `multiband` is set.
    pub compress: bool,

    /// Split the dynamics stage into crossover bands instead of one full-band compressor
    pub multiband: bool,

    /// Per-band compressor settings, lowest band first (`crossovers_hz.len() + 1` entries)
    pub bands: Vec<BandSettings>,

    /// Crossover split frequencies in Hz, strictly increasing
    pub crossovers_hz: Vec<f64>,

    /// Compressor settings used when `multiband` is off
    pub single_band: BandSettings,

    /// Full-band soft saturation amount, 0..=100 percent
    pub saturation: f64,

    /// Harmonic exciter drive, 0..=1
    pub exciter_drive: f64,

    /// Stereo width (0 = mono, 1 = unchanged, 2 = maximum)
    pub stereo_width: f64,

    /// Integrated loudness target in LUFS; `None` disables normalization
    pub target_lufs: Option<f64>,

    /// Final limiter settings
    pub limiter: LimiterSettings,

    /// Wall-clock length of each processing block in seconds
    pub chunk_duration_seconds: f64,
}

/// Equalizer band gains in dB
///
/// A band at 0 dB is left out of the chain entirely.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EqSettings {
    /// Low shelf at 250 Hz
    pub bass_db: f64,
    /// Peaking band at 1 kHz (negative values cut)
    pub mid_db: f64,
    /// Peaking band at 4 kHz
    pub presence_db: f64,
    /// High shelf at 8 kHz
    pub treble_db: f64,
}

/// Settings for one compressor band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSettings {
    /// Threshold in dB (-90.0 to 0.0)
    pub threshold_db: f64,

    /// Compression ratio (>= 1.0)
    pub ratio: f64,

    /// Attack time in milliseconds
    pub attack_ms: f64,

    /// Release time in milliseconds
    pub release_ms: f64,

    /// Makeup gain in dB
    #[serde(default)]
    pub makeup_db: f64,
}

/// Lookahead limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    /// Output ceiling in dBFS (-20.0 to 0.0)
    pub ceiling_db: f64,

    /// Lookahead in milliseconds (0 < lookahead <= 50)
    pub lookahead_ms: f64,

    /// Release time in milliseconds
    pub release_ms: f64,
}

impl BandSettings {
    /// Create band settings with no makeup gain
    pub const fn new(threshold_db: f64, ratio: f64, attack_ms: f64, release_ms: f64) -> Self {
        Self {
            threshold_db,
            ratio,
            attack_ms,
            release_ms,
            makeup_db: 0.0,
        }
    }

    /// Low band default (below the first crossover)
    pub const LOW: Self = Self::new(-25.0, 6.0, 10.0, 200.0);

    /// Mid band default
    pub const MID: Self = Self::new(-20.0, 3.0, 5.0, 150.0);

    /// High band default (above the last crossover)
    pub const HIGH: Self = Self::new(-15.0, 4.0, 1.0, 50.0);

    /// Full-band default
    pub const SINGLE: Self = Self::new(-20.0, 4.0, 5.0, 50.0);

    fn validate(&self, label: &str) -> Result<()> {
        if !(MIN_THRESHOLD_DB..=0.0).contains(&self.threshold_db) {
            return Err(MasteringError::config(format!(
                "{label}: threshold {} dB outside {MIN_THRESHOLD_DB}..=0",
                self.threshold_db
            )));
        }
        if !self.ratio.is_finite() || self.ratio < 1.0 {
            return Err(MasteringError::config(format!(
                "{label}: ratio must be >= 1, got {}",
                self.ratio
            )));
        }
        if !self.attack_ms.is_finite() || self.attack_ms <= 0.0 {
            return Err(MasteringError::config(format!(
                "{label}: attack must be > 0 ms, got {}",
                self.attack_ms
            )));
        }
        if !self.release_ms.is_finite() || self.release_ms <= 0.0 {
            return Err(MasteringError::config(format!(
                "{label}: release must be > 0 ms, got {}",
                self.release_ms
            )));
        }
        if !self.makeup_db.is_finite() || self.makeup_db.abs() > MAX_EQ_GAIN_DB {
            return Err(MasteringError::config(format!(
                "{label}: makeup gain {} dB outside ±{MAX_EQ_GAIN_DB}",
                self.makeup_db
            )));
        }
        Ok(())
    }
}

impl Default for BandSettings {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl EqSettings {
    /// Create EQ settings from the four band gains
    pub const fn new(bass_db: f64, mid_db: f64, presence_db: f64, treble_db: f64) -> Self {
        Self {
            bass_db,
            mid_db,
            presence_db,
            treble_db,
        }
    }

    /// Whether every band is at 0 dB
    pub fn is_flat(&self) -> bool {
        self.gains().iter().all(|&(_, gain)| gain == 0.0)
    }

    /// Band names paired with their gains, low to high
    pub fn gains(&self) -> [(&'static str, f64); 4] {
        [
            ("bass", self.bass_db),
            ("mid", self.mid_db),
            ("presence", self.presence_db),
            ("treble", self.treble_db),
        ]
    }

    fn validate(&self) -> Result<()> {
        for (name, gain) in self.gains() {
            if !gain.is_finite() || gain.abs() > MAX_EQ_GAIN_DB {
                return Err(MasteringError::config(format!(
                    "eq.{name}_db {gain} outside ±{MAX_EQ_GAIN_DB} dB"
                )));
            }
        }
        Ok(())
    }
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            ceiling_db: -0.3,
            lookahead_ms: 5.0,
            release_ms: 50.0,
        }
    }
}

impl LimiterSettings {
    /// Ceiling as a linear amplitude
    pub fn ceiling_linear(&self) -> f64 {
        10.0_f64.powf(self.ceiling_db / 20.0)
    }

    fn validate(&self) -> Result<()> {
        if !(-20.0..=0.0).contains(&self.ceiling_db) {
            return Err(MasteringError::config(format!(
                "limiter.ceiling_db {} outside -20..=0",
                self.ceiling_db
            )));
        }
        if !(self.lookahead_ms > 0.0 && self.lookahead_ms <= 50.0) {
            return Err(MasteringError::config(format!(
                "limiter.lookahead_ms {} outside (0, 50]",
                self.lookahead_ms
            )));
        }
        if !self.release_ms.is_finite() || self.release_ms <= 0.0 {
            return Err(MasteringError::config(format!(
                "limiter.release_ms must be > 0, got {}",
                self.release_ms
            )));
        }
        Ok(())
    }
}

impl Default for MasteringConfig {
    fn default() -> Self {
        Self {
            eq: EqSettings::default(),
            compress: false,
            multiband: false,
            bands: vec![BandSettings::LOW, BandSettings::MID, BandSettings::HIGH],
            crossovers_hz: vec![250.0, 4000.0],
            single_band: BandSettings::SINGLE,
            saturation: 0.0,
            exciter_drive: 0.0,
            stereo_width: 1.0,
            target_lufs: None,
            limiter: LimiterSettings::default(),
            chunk_duration_seconds: 30.0,
        }
    }
}

impl MasteringConfig {
    /// Whether the dynamics stage runs at all
    pub fn compression_enabled(&self) -> bool {
        self.compress || self.multiband
    }

    /// Whether the measuring pass runs
    pub fn normalizes(&self) -> bool {
        self.target_lufs.is_some()
    }

    /// Check every parameter against its accepted range
    ///
    /// Nothing downstream clamps: an out-of-range value is rejected here.
    pub fn validate(&self) -> Result<()> {
        self.eq.validate()?;

        if !(0.0..=100.0).contains(&self.saturation) {
            return Err(MasteringError::config(format!(
                "saturation {} outside 0..=100",
                self.saturation
            )));
        }
        if !(0.0..=1.0).contains(&self.exciter_drive) {
            return Err(MasteringError::config(format!(
                "exciter_drive {} outside 0..=1",
                self.exciter_drive
            )));
        }
        if !(0.0..=2.0).contains(&self.stereo_width) {
            return Err(MasteringError::config(format!(
                "stereo_width {} outside 0..=2",
                self.stereo_width
            )));
        }

        if let Some(target) = self.target_lufs {
            if !(-70.0..=0.0).contains(&target) {
                return Err(MasteringError::config(format!(
                    "target_lufs {target} outside -70..=0"
                )));
            }
        }

        self.limiter.validate()?;

        if !(self.chunk_duration_seconds > 0.0 && self.chunk_duration_seconds <= MAX_CHUNK_SECONDS)
        {
            return Err(MasteringError::config(format!(
                "chunk_duration_seconds {} outside (0, {MAX_CHUNK_SECONDS}]",
                self.chunk_duration_seconds
            )));
        }

        self.single_band.validate("single_band")?;

        if self.multiband {
            self.validate_crossovers()?;
            if self.bands.len() != self.crossovers_hz.len() + 1 {
                return Err(MasteringError::config(format!(
                    "{} crossover(s) need {} bands, got {}",
                    self.crossovers_hz.len(),
                    self.crossovers_hz.len() + 1,
                    self.bands.len()
                )));
            }
            for (index, band) in self.bands.iter().enumerate() {
                band.validate(&format!("bands[{index}]"))?;
            }
        }

        Ok(())
    }

    /// Check crossover frequencies against a concrete sample rate
    ///
    /// Called once the stream's rate is known; `validate` only checks ordering.
    pub fn validate_for_sample_rate(&self, sample_rate: u32) -> Result<()> {
        if !self.multiband {
            return Ok(());
        }
        let nyquist = f64::from(sample_rate) / 2.0;
        if let Some(&top) = self.crossovers_hz.last() {
            if top >= nyquist {
                return Err(MasteringError::config(format!(
                    "crossover {top} Hz is not below Nyquist ({nyquist} Hz)"
                )));
            }
        }
        Ok(())
    }

    fn validate_crossovers(&self) -> Result<()> {
        if self.crossovers_hz.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(MasteringError::config(
                "crossover frequencies must be positive",
            ));
        }
        if self.crossovers_hz.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MasteringError::config(
                "crossover frequencies must be strictly increasing",
            ));
        }
        Ok(())
    }
}
