mod audio;

pub use audio::{sanitize_samples, AudioBlock, SampleRate, StreamSpec};
