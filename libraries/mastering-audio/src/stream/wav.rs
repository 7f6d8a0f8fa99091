/// WAV output via hound
use mastering_core::{AudioBlock, MasteringError, Result, SampleSink, StreamSpec};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Suffix of the flag file written next to a finished output
pub const COMPLETE_SUFFIX: &str = "complete";

/// Suffix of the marker file written next to an abandoned output
pub const INCOMPLETE_SUFFIX: &str = "incomplete";

/// `song.wav` + `complete` -> `song.wav.complete`
pub fn marker_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Sample encoding of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// 16-bit signed PCM
    Pcm16,
    /// 24-bit signed PCM
    #[default]
    Pcm24,
    /// 32-bit IEEE float
    Float32,
}

impl OutputFormat {
    /// All formats, in CLI order
    pub const ALL: [Self; 3] = [Self::Pcm16, Self::Pcm24, Self::Float32];

    /// Bits per sample
    pub fn bits(self) -> u16 {
        match self {
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
            Self::Float32 => 32,
        }
    }

    /// Short name used on the command line and in config files
    pub fn name(self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::Pcm24 => "pcm24",
            Self::Float32 => "float32",
        }
    }

    /// Accepted spellings
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Pcm16 => &["pcm16", "16", "s16"],
            Self::Pcm24 => &["pcm24", "24", "s24"],
            Self::Float32 => &["float32", "32", "f32", "float"],
        }
    }

    fn wav_spec(self, spec: &StreamSpec) -> hound::WavSpec {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate.as_hz(),
            bits_per_sample: self.bits(),
            sample_format: match self {
                Self::Float32 => hound::SampleFormat::Float,
                Self::Pcm16 | Self::Pcm24 => hound::SampleFormat::Int,
            },
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = MasteringError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.aliases().contains(&lower.as_str()))
            .ok_or_else(|| {
                MasteringError::config(format!(
                    "Unknown output format '{s}' (expected pcm16, pcm24 or float32)"
                ))
            })
    }
}

/// Streaming WAV writer
///
/// Integer formats clamp to [-1, 1] and scale symmetrically, so -1.0 and 1.0
/// map to equal magnitudes.
pub struct WavSink {
    path: PathBuf,
    format: OutputFormat,
    channels: u16,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    write_complete_flag: bool,
    frames_written: u64,
}

impl WavSink {
    /// Create (or truncate) the output file
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if the file cannot be created
    pub fn create(path: impl AsRef<Path>, spec: &StreamSpec, format: OutputFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = hound::WavWriter::create(&path, format.wav_spec(spec))
            .map_err(|e| MasteringError::io(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), %format, "Created WAV output");

        Ok(Self {
            path,
            format,
            channels: spec.channels,
            writer: Some(writer),
            write_complete_flag: false,
            frames_written: 0,
        })
    }

    /// Also write `<output>.complete` after a successful `finish`
    #[must_use]
    pub fn with_complete_flag(mut self, enabled: bool) -> Self {
        self.write_complete_flag = enabled;
        self
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn writer(&mut self) -> Result<&mut hound::WavWriter<BufWriter<File>>> {
        self.writer
            .as_mut()
            .ok_or_else(|| MasteringError::invalid_state("WAV output already finalized"))
    }

    fn finalize_writer(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| MasteringError::io(format!("{}: {e}", self.path.display())))?;
        }
        Ok(())
    }
}

fn encode_error(path: &Path, err: &hound::Error) -> MasteringError {
    MasteringError::io(format!("{}: {err}", path.display()))
}

impl SampleSink for WavSink {
    fn write_block(&mut self, block: &AudioBlock) -> Result<()> {
        if block.channels != self.channels {
            return Err(MasteringError::invalid_state(format!(
                "Block has {} channel(s), output has {}",
                block.channels, self.channels
            )));
        }

        let format = self.format;
        let path = self.path.clone();
        let writer = self.writer()?;

        match format {
            OutputFormat::Pcm16 => {
                for &sample in &block.samples {
                    let value = (sample.clamp(-1.0, 1.0) * 32_767.0).round() as i16;
                    writer
                        .write_sample(value)
                        .map_err(|e| encode_error(&path, &e))?;
                }
            }
            OutputFormat::Pcm24 => {
                for &sample in &block.samples {
                    let value = (f64::from(sample.clamp(-1.0, 1.0)) * 8_388_607.0).round() as i32;
                    writer
                        .write_sample(value)
                        .map_err(|e| encode_error(&path, &e))?;
                }
            }
            OutputFormat::Float32 => {
                for &sample in &block.samples {
                    writer
                        .write_sample(sample)
                        .map_err(|e| encode_error(&path, &e))?;
                }
            }
        }

        self.frames_written += block.frames() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finalize_writer()?;

        let stale = marker_path(&self.path, INCOMPLETE_SUFFIX);
        if stale.exists() {
            std::fs::remove_file(&stale)?;
        }
        if self.write_complete_flag {
            std::fs::write(marker_path(&self.path, COMPLETE_SUFFIX), b"")?;
        }

        tracing::debug!(
            path = %self.path.display(),
            frames = self.frames_written,
            "Finalized WAV output"
        );
        Ok(())
    }

    fn mark_incomplete(&mut self) -> Result<()> {
        if let Err(e) = self.finalize_writer() {
            tracing::warn!(path = %self.path.display(), "Could not finalize partial output: {e}");
        }

        let marker = marker_path(&self.path, INCOMPLETE_SUFFIX);
        std::fs::write(&marker, b"")?;
        tracing::warn!(marker = %marker.display(), "Output flagged as incomplete");
        Ok(())
    }
}
