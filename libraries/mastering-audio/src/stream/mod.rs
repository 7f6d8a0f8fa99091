//! Sample streams
//!
//! Adapters implementing `SampleSource` / `SampleSink` for files (Symphonia
//! decoding, hound WAV encoding) and for in-memory buffers.

mod buffer;
mod decoder;
mod wav;

pub use buffer::{BufferSink, BufferSource};
pub use decoder::SymphoniaSource;
pub use wav::{marker_path, OutputFormat, WavSink, COMPLETE_SUFFIX, INCOMPLETE_SUFFIX};
