//! Mastering Core
//!
//! Shared types, configuration, presets, and error handling for the mastering chain.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Stream Types**: `AudioBlock`, `StreamSpec`, `SampleRate`
//! - **Configuration**: `MasteringConfig` and its nested stage settings, genre `Preset`s
//! - **Stream Traits**: `SampleSource`, `SampleSink`
//! - **Error Handling**: Unified `MasteringError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use mastering_core::{MasteringConfig, Preset};
//!
//! let mut config = MasteringConfig::default();
//! Preset::Techno.apply_to(&mut config);
//! config.target_lufs = Some(-14.0);
//! assert!(config.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod preset;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{BandSettings, EqSettings, LimiterSettings, MasteringConfig};
pub use error::{MasteringError, Result};
pub use preset::Preset;
pub use traits::{SampleSink, SampleSource};
pub use types::{sanitize_samples, AudioBlock, SampleRate, StreamSpec};
