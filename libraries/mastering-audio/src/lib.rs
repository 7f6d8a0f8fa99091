//! Mastering Audio
//!
//! Chunked mastering signal chain.
//!
//! This crate provides:
//! - Effects carrying their state across chunks (4-band EQ, Linkwitz-Riley
//!   crossover, saturator, exciter, stereo widener, multiband compressor)
//! - Sample streams: Symphonia decoding, hound WAV output, in-memory buffers
//! - The two-pass `MasteringPipeline` (measure, then normalize and limit)
//!
//! # Example: Mastering a File
//!
//! ```rust,no_run
//! use mastering_audio::{MasteringPipeline, OutputFormat, SymphoniaSource, WavSink};
//! use mastering_core::{MasteringConfig, Preset, SampleSource};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = MasteringConfig {
//!     compress: true,
//!     target_lufs: Some(-14.0),
//!     ..MasteringConfig::default()
//! };
//! Preset::Techno.apply_to(&mut config);
//!
//! let mut source = SymphoniaSource::open("/music/mix.flac")?;
//! let mut sink = WavSink::create("/music/mix_mastered.wav", &source.spec(), OutputFormat::Pcm24)?;
//!
//! let report = MasteringPipeline::new(config)?.run(&mut source, &mut sink)?;
//! println!("Applied {:+.1} dB", report.gain_db);
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Using Effects
//!
//! ```rust
//! use mastering_audio::effects::{EffectChain, Equalizer, StereoWidener};
//! use mastering_core::{EqSettings, StreamSpec};
//!
//! let spec = StreamSpec::stereo(44_100);
//! let mut chain = EffectChain::new();
//! chain.add_effect(Box::new(Equalizer::new(&EqSettings::new(3.0, 0.0, 1.5, 2.0), &spec)));
//! chain.add_effect(Box::new(StereoWidener::new(1.2, 2).unwrap()));
//!
//! let mut buffer = vec![0.1_f32; 2 * 1024];
//! chain.process(&mut buffer);
//! ```

#![forbid(unsafe_code)]

pub mod effects;
pub mod pipeline;
pub mod stream;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use pipeline::{
    master_buffer, CancellationToken, MasteringPipeline, MasteringReport, Pass, PipelineState,
    Progress,
};
pub use stream::{
    marker_path, BufferSink, BufferSource, OutputFormat, SymphoniaSource, WavSink,
    COMPLETE_SUFFIX, INCOMPLETE_SUFFIX,
};
