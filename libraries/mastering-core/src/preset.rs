/// Genre presets
///
/// A preset is a static EQ curve. It populates `MasteringConfig::eq` before the
/// config is validated and handed to the pipeline.
use crate::config::{EqSettings, MasteringConfig};
use crate::error::MasteringError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in genre EQ curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Techno,
    Dubstep,
    Pop,
    Rock,
}

impl Preset {
    /// All presets, in display order
    pub const ALL: [Self; 4] = [Self::Techno, Self::Dubstep, Self::Pop, Self::Rock];

    /// Lowercase preset name
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Techno => "techno",
            Preset::Dubstep => "dubstep",
            Preset::Pop => "pop",
            Preset::Rock => "rock",
        }
    }

    /// One-line summary of the curve
    pub fn description(&self) -> &'static str {
        match self {
            Preset::Techno => "Boosted sub-bass and highs, scooped mids for a powerful club sound.",
            Preset::Dubstep => "Aggressive low-end and crisp highs, with a significant mid-cut.",
            Preset::Pop => "Focused on vocal clarity with a solid low-end and bright highs.",
            Preset::Rock => "Warm low-mids for guitars and punchy presence for snare/vocals.",
        }
    }

    /// EQ gains for this preset
    ///
    /// The mid band is stored as a gain, so a mid cut of 3 dB appears as -3.
    pub fn eq(&self) -> EqSettings {
        match self {
            Preset::Techno => EqSettings::new(4.0, -3.0, 1.0, 3.0),
            Preset::Dubstep => EqSettings::new(5.0, -4.0, 2.0, 3.5),
            Preset::Pop => EqSettings::new(2.0, 0.0, 3.5, 2.5),
            Preset::Rock => EqSettings::new(1.5, 2.0, 2.5, 1.0),
        }
    }

    /// Overwrite the EQ section of `config` with this preset's curve
    pub fn apply_to(&self, config: &mut MasteringConfig) {
        config.eq = self.eq();
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = MasteringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(Preset::name).collect();
                MasteringError::config(format!(
                    "unknown preset '{wanted}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}
