/// Decoding source using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/M4A
use mastering_core::{
    sanitize_samples, AudioBlock, MasteringError, Result, SampleRate, SampleSource, StreamSpec,
};
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Chunked reader over an audio file
///
/// Variable-size packets are re-blocked so every block except the last has
/// exactly the requested number of frames.
pub struct SymphoniaSource {
    path: PathBuf,
    /// Format reader (container parser)
    format: Box<dyn FormatReader>,
    /// Audio decoder
    decoder: Box<dyn Decoder>,
    track_id: u32,
    spec: StreamSpec,
    /// Decoded samples not yet handed out
    pending: Vec<f32>,
    /// Frames handed out so far
    position: u64,
    /// End of the container reached
    exhausted: bool,
}

impl SymphoniaSource {
    /// Open and probe a file
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if the file cannot be opened or probed, has
    /// no audio track, or has more than two channels
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| MasteringError::io(format!("{}: {e}", path.display())))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| MasteringError::io(format!("Failed to probe {}: {e}", path.display())))?;

        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| MasteringError::io(format!("No audio track in {}", path.display())))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| MasteringError::io("Unknown sample rate"))?;
        let channels = track
            .codec_params
            .channels
            .map_or(2, |c| c.count() as u16);
        if channels == 0 || channels > StreamSpec::MAX_CHANNELS {
            return Err(MasteringError::io(format!(
                "Unsupported channel count {channels} in {} (mono or stereo only)",
                path.display()
            )));
        }

        let mut spec = StreamSpec::new(SampleRate::new(sample_rate), channels);
        if let Some(frames) = track.codec_params.n_frames {
            spec = spec.with_total_frames(frames);
        }
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| MasteringError::io(format!("Failed to create decoder: {e}")))?;

        tracing::debug!(
            path = %path.display(),
            sample_rate,
            channels,
            total_frames = ?spec.total_frames,
            "Opened audio source"
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            spec,
            pending: Vec::new(),
            position: 0,
            exhausted: false,
        })
    }

    /// Path this source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the next packet of our track into `pending`
    fn decode_next_packet(&mut self) -> Result<()> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.exhausted = true;
                    return Ok(());
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(MasteringError::io(format!("Error reading packet: {e}")));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let channels = decoded.spec().channels.count();
                    if channels != usize::from(self.spec.channels) {
                        return Err(MasteringError::io(format!(
                            "Channel count changed mid-stream ({} -> {channels})",
                            self.spec.channels
                        )));
                    }
                    let start = self.pending.len();
                    append_interleaved(&decoded, &mut self.pending);
                    let replaced = sanitize_samples(&mut self.pending[start..]);
                    if replaced > 0 {
                        tracing::warn!(
                            path = %self.path.display(),
                            replaced,
                            "Replaced non-finite samples with silence"
                        );
                    }
                    return Ok(());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!(path = %self.path.display(), "Skipping undecodable packet: {e}");
                }
                Err(e) => {
                    return Err(MasteringError::io(format!("Decode error: {e}")));
                }
            }
        }
    }
}

impl SampleSource for SymphoniaSource {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn read_block(&mut self, max_frames: usize) -> Result<Option<AudioBlock>> {
        let channels = usize::from(self.spec.channels);
        let wanted = max_frames * channels;

        while self.pending.len() < wanted && !self.exhausted {
            self.decode_next_packet()?;
        }

        if self.pending.is_empty() || wanted == 0 {
            return Ok(None);
        }

        let take = wanted.min(self.pending.len());
        let rest = self.pending.split_off(take);
        let samples = std::mem::replace(&mut self.pending, rest);

        let block = AudioBlock::for_stream(samples, &self.spec, self.position);
        self.position = block.end_frame();
        Ok(Some(block))
    }

    fn rewind(&mut self) -> Result<()> {
        *self = Self::open(&self.path)?;
        Ok(())
    }
}

/// Convert a decoded buffer to interleaved f32
///
/// Signed integers use symmetric scaling (divide by 2^(N-1)); unsigned formats
/// are re-centred around zero first. Float input is passed through unclamped so
/// overs survive until the limiter; NaN and infinities are zeroed by the caller.
fn append_interleaved(decoded: &AudioBufferRef<'_>, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave(buf, |s| s, out),
        AudioBufferRef::F64(buf) => interleave(buf, |s| s as f32, out),
        AudioBufferRef::S32(buf) => interleave(buf, |s| (f64::from(s) / 2_147_483_648.0) as f32, out),
        AudioBufferRef::S24(buf) => interleave(buf, |s| s.inner() as f32 / 8_388_608.0, out),
        AudioBufferRef::S16(buf) => interleave(buf, |s| f32::from(s) / 32_768.0, out),
        AudioBufferRef::S8(buf) => interleave(buf, |s| f32::from(s) / 128.0, out),
        AudioBufferRef::U32(buf) => interleave(
            buf,
            |s| ((f64::from(s) - 2_147_483_648.0) / 2_147_483_648.0) as f32,
            out,
        ),
        AudioBufferRef::U24(buf) => {
            interleave(buf, |s| (s.inner() as f32 - 8_388_608.0) / 8_388_608.0, out);
        }
        AudioBufferRef::U16(buf) => interleave(buf, |s| (f32::from(s) - 32_768.0) / 32_768.0, out),
        AudioBufferRef::U8(buf) => interleave(buf, |s| (f32::from(s) - 128.0) / 128.0, out),
    }
}

fn interleave<T: Sample>(buf: &AudioBuffer<T>, convert: impl Fn(T) -> f32, out: &mut Vec<f32>) {
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    out.reserve(frames * channels);

    for frame in 0..frames {
        for ch in 0..channels {
            out.push(convert(buf.chan(ch)[frame]));
        }
    }
}
