/// Command-line arguments
use clap::{Args, Parser};
use mastering_audio::OutputFormat;
use mastering_core::Preset;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "master")]
#[command(
    about = "Chunked audio mastering: EQ, dynamics, stereo imaging, loudness normalization and limiting",
    long_about = None
)]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG, AAC/M4A)
    #[arg(required_unless_present = "print_config")]
    pub inputs: Vec<PathBuf>,

    /// Output file (single input only)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for mastered files (default: next to each input)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output sample format: pcm16, pcm24 or float32
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Suffix appended to the input file stem
    #[arg(long)]
    pub suffix: Option<String>,

    /// Write `<output>.complete` next to every finished file
    #[arg(long)]
    pub complete_flag: bool,

    /// Configuration file (default: ./master.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Files processed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    #[command(flatten)]
    pub mastering: MasteringArgs,
}

/// Flags mapped onto `MasteringConfig`
#[derive(Debug, Clone, Default, Args)]
pub struct MasteringArgs {
    /// Genre preset populating the EQ: techno, dubstep, pop, rock
    #[arg(long, value_parser = parse_preset)]
    pub preset: Option<Preset>,

    /// Bass shelf gain at 250 Hz, in dB
    #[arg(long = "bass", visible_alias = "bass-boost", allow_hyphen_values = true)]
    pub bass_db: Option<f64>,

    /// Mid peak gain at 1 kHz, in dB
    #[arg(long = "mid", allow_hyphen_values = true)]
    pub mid_db: Option<f64>,

    /// Mid cut at 1 kHz, in dB (3 means a -3 dB peak)
    #[arg(long = "mid-cut", allow_hyphen_values = true, conflicts_with = "mid_db")]
    pub mid_cut_db: Option<f64>,

    /// Presence peak gain at 4 kHz, in dB
    #[arg(long = "presence", visible_alias = "presence-boost", allow_hyphen_values = true)]
    pub presence_db: Option<f64>,

    /// Treble shelf gain at 8 kHz, in dB
    #[arg(long = "treble", visible_alias = "treble-boost", allow_hyphen_values = true)]
    pub treble_db: Option<f64>,

    /// Enable full-band compression
    #[arg(long)]
    pub compress: bool,

    /// Enable 3-band compression (implies --compress)
    #[arg(long)]
    pub multiband: bool,

    /// Soft saturation amount, 0-100 %
    #[arg(long)]
    pub saturation: Option<f64>,

    /// Harmonic exciter drive, 0-1
    #[arg(long = "exciter")]
    pub exciter_drive: Option<f64>,

    /// Stereo width, 0 (mono) to 2
    #[arg(long = "width")]
    pub stereo_width: Option<f64>,

    /// Integrated loudness target in LUFS
    #[arg(long = "lufs", allow_hyphen_values = true, conflicts_with = "no_normalize")]
    pub target_lufs: Option<f64>,

    /// Skip loudness normalization even if a target is configured
    #[arg(long)]
    pub no_normalize: bool,

    /// Limiter ceiling in dBFS
    #[arg(long = "ceiling", allow_hyphen_values = true)]
    pub ceiling_db: Option<f64>,

    /// Limiter lookahead in milliseconds
    #[arg(long)]
    pub lookahead_ms: Option<f64>,

    /// Limiter release in milliseconds
    #[arg(long)]
    pub release_ms: Option<f64>,

    /// Processing chunk length in seconds
    #[arg(long = "chunk-seconds")]
    pub chunk_duration_seconds: Option<f64>,
}

fn parse_preset(value: &str) -> Result<Preset, String> {
    value.parse().map_err(|e: mastering_core::MasteringError| e.to_string())
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse().map_err(|e: mastering_core::MasteringError| e.to_string())
}
