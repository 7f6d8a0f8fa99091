/// Stream traits shared by the pipeline and its I/O adapters
use crate::error::Result;
use crate::types::{AudioBlock, StreamSpec};

/// Chunked reader over a decoded PCM stream
///
/// Implementers yield consecutive blocks whose concatenation reproduces the
/// whole stream with no gaps or overlaps. Every block carries the rate and
/// channel count reported by `spec()`.
pub trait SampleSource: Send {
    /// Shape of the stream
    fn spec(&self) -> StreamSpec;

    /// Read up to `max_frames` frames
    ///
    /// Returns `None` at end of stream. Only the final block may be shorter
    /// than `max_frames`.
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if decoding fails
    fn read_block(&mut self, max_frames: usize) -> Result<Option<AudioBlock>>;

    /// Restart the stream from frame 0
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if the underlying source cannot be reopened
    fn rewind(&mut self) -> Result<()>;
}

/// Sequential writer for processed blocks
pub trait SampleSink: Send {
    /// Append a block to the output
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if encoding or writing fails
    fn write_block(&mut self, block: &AudioBlock) -> Result<()>;

    /// Finalize the output container after the last block
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if the container cannot be finalized
    fn finish(&mut self) -> Result<()>;

    /// Flag the partially written output as invalid
    ///
    /// Called when processing fails or is cancelled after writing started.
    ///
    /// # Errors
    /// Returns `MasteringError::Io` if the marker cannot be written
    fn mark_incomplete(&mut self) -> Result<()>;
}
