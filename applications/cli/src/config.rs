/// CLI configuration
///
/// Layers, lowest precedence first: built-in defaults, a TOML file
/// (`--config`, or `./master.toml` when present), `MASTER_*` environment
/// variables, then command-line flags.
use crate::args::Cli;
use crate::error::{CliError, Result};
use mastering_audio::OutputFormat;
use mastering_core::{MasteringConfig, Preset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "master.toml";

/// Environment prefix; nested keys use `__`, e.g. `MASTER_MASTERING__TARGET_LUFS=-14`
pub const ENV_PREFIX: &str = "MASTER";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CliSettings {
    /// Genre preset, applied to the EQ before explicit EQ flags
    #[serde(default)]
    pub preset: Option<Preset>,

    #[serde(default)]
    pub mastering: MasteringConfig,

    #[serde(default = "default_output")]
    pub output: OutputSettings,

    /// Files processed concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputSettings {
    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_suffix")]
    pub suffix: String,

    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub complete_flag: bool,
}

fn default_output() -> OutputSettings {
    OutputSettings {
        format: default_format(),
        suffix: default_suffix(),
        directory: None,
        complete_flag: false,
    }
}

fn default_format() -> String {
    OutputFormat::default().name().to_string()
}

fn default_suffix() -> String {
    "_mastered".to_string()
}

fn default_jobs() -> usize {
    1
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            preset: None,
            mastering: MasteringConfig::default(),
            output: default_output(),
            jobs: default_jobs(),
        }
    }
}

impl CliSettings {
    /// Load settings from the config file and the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(config_file, None)
    }

    /// Load settings, reading environment variables from `env` instead of the
    /// process environment when given
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    tracing::debug!(path = %default_path.display(), "Using config file");
                    builder = builder.add_source(config::File::from(default_path));
                }
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Fold command-line flags into the settings and validate the result
    ///
    /// The preset is applied to the EQ first, so explicit EQ flags win over it.
    /// The returned settings carry no preset: its curve is already in
    /// `mastering.eq`.
    pub fn resolve(mut self, cli: &Cli) -> Result<Self> {
        let args = &cli.mastering;
        let config = &mut self.mastering;

        if let Some(preset) = args.preset.or(self.preset.take()) {
            preset.apply_to(config);
        }

        if let Some(db) = args.bass_db {
            config.eq.bass_db = db;
        }
        if let Some(db) = args.mid_db {
            config.eq.mid_db = db;
        }
        if let Some(cut) = args.mid_cut_db {
            config.eq.mid_db = -cut;
        }
        if let Some(db) = args.presence_db {
            config.eq.presence_db = db;
        }
        if let Some(db) = args.treble_db {
            config.eq.treble_db = db;
        }

        config.compress |= args.compress;
        config.multiband |= args.multiband;

        if let Some(amount) = args.saturation {
            config.saturation = amount;
        }
        if let Some(drive) = args.exciter_drive {
            config.exciter_drive = drive;
        }
        if let Some(width) = args.stereo_width {
            config.stereo_width = width;
        }

        if args.no_normalize {
            config.target_lufs = None;
        } else if let Some(lufs) = args.target_lufs {
            config.target_lufs = Some(lufs);
        }

        if let Some(db) = args.ceiling_db {
            config.limiter.ceiling_db = db;
        }
        if let Some(ms) = args.lookahead_ms {
            config.limiter.lookahead_ms = ms;
        }
        if let Some(ms) = args.release_ms {
            config.limiter.release_ms = ms;
        }
        if let Some(seconds) = args.chunk_duration_seconds {
            config.chunk_duration_seconds = seconds;
        }

        if let Some(format) = cli.format {
            self.output.format = format.name().to_string();
        }
        if let Some(suffix) = &cli.suffix {
            self.output.suffix = suffix.clone();
        }
        if let Some(dir) = &cli.output_dir {
            self.output.directory = Some(dir.clone());
        }
        self.output.complete_flag |= cli.complete_flag;

        if let Some(jobs) = cli.jobs {
            self.jobs = jobs;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.mastering.validate()?;
        self.output_format()?;
        if self.jobs == 0 {
            return Err(CliError::Config("jobs must be at least 1".to_string()));
        }
        if self.output.suffix.contains(std::path::is_separator) {
            return Err(CliError::Config(format!(
                "output suffix {:?} contains a path separator",
                self.output.suffix
            )));
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        Ok(self.output.format.parse()?)
    }

    /// Render as a TOML document accepted by `--config`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
