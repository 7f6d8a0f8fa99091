/// In-memory sample streams
use mastering_core::{
    sanitize_samples, AudioBlock, MasteringError, Result, SampleSink, SampleSource, StreamSpec,
};

/// Source over an interleaved buffer already in memory
#[derive(Debug, Clone)]
pub struct BufferSource {
    spec: StreamSpec,
    samples: Vec<f32>,
    position: usize,
}

impl BufferSource {
    /// Wrap interleaved samples
    ///
    /// # Errors
    /// Returns `MasteringError::InvalidState` if the length is not a whole number of frames
    ///
    /// NaN and infinite samples are replaced with silence.
    pub fn new(spec: StreamSpec, mut samples: Vec<f32>) -> Result<Self> {
        let channels = usize::from(spec.channels);
        if channels == 0 || samples.len() % channels != 0 {
            return Err(MasteringError::invalid_state(format!(
                "{} samples do not divide into {} channel(s)",
                samples.len(),
                spec.channels
            )));
        }
        let replaced = sanitize_samples(&mut samples);
        if replaced > 0 {
            tracing::warn!(replaced, "Replaced non-finite samples with silence");
        }
        let frames = (samples.len() / channels) as u64;
        Ok(Self {
            spec: spec.with_total_frames(frames),
            samples,
            position: 0,
        })
    }
}

impl SampleSource for BufferSource {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn read_block(&mut self, max_frames: usize) -> Result<Option<AudioBlock>> {
        let channels = usize::from(self.spec.channels);
        if self.position >= self.samples.len() || max_frames == 0 {
            return Ok(None);
        }

        let end = (self.position + max_frames * channels).min(self.samples.len());
        let start_frame = (self.position / channels) as u64;
        let block = AudioBlock::for_stream(
            self.samples[self.position..end].to_vec(),
            &self.spec,
            start_frame,
        );
        self.position = end;
        Ok(Some(block))
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}

/// Sink collecting every written block into one buffer
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    samples: Vec<f32>,
    blocks: usize,
    finished: bool,
    incomplete: bool,
}

impl BufferSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples written so far
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Take ownership of the written samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of blocks written
    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    /// Whether `finish` was called
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the output was flagged as invalid
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

impl SampleSink for BufferSink {
    fn write_block(&mut self, block: &AudioBlock) -> Result<()> {
        if self.finished {
            return Err(MasteringError::invalid_state("write after finish"));
        }
        self.samples.extend_from_slice(&block.samples);
        self.blocks += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn mark_incomplete(&mut self) -> Result<()> {
        self.incomplete = true;
        Ok(())
    }
}
