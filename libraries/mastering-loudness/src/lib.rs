//! Loudness measurement and final limiting for the mastering chain
//!
//! This crate provides:
//! - EBU R128 integrated loudness measurement over a streamed signal
//! - The fixed normalization gain derived from that measurement
//! - A lookahead limiter that holds the output under a ceiling
//!
//! # Architecture
//!
//! ```text
//! Pass 1 (measuring):
//! ┌─────────────┐     ┌─────────────────────┐     ┌─────────────────────┐
//! │ Chain Out   │ ──► │ LoudnessAccumulator │ ──► │ LoudnessMeasurement │
//! └─────────────┘     └─────────────────────┘     └─────────────────────┘
//!                                                            │
//!                                                            ▼
//! Pass 2 (processing):                              ┌───────────────────┐
//! ┌─────────────┐     ┌──────────────┐              │ NormalizationGain │
//! │ Chain Out   │ ──► │ Gain Apply   │ ◄─────────── └───────────────────┘
//! └─────────────┘     └──────────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────────┐
//!                     │ LookaheadLimiter │
//!                     └──────────────────┘
//! ```

#![deny(unsafe_code)]

mod accumulator;
mod error;
mod limiter;
mod normalizer;

pub use accumulator::{measure, LoudnessAccumulator, LoudnessMeasurement};
pub use error::{LoudnessError, Result};
pub use limiter::LookaheadLimiter;
pub use normalizer::NormalizationGain;

/// EBU R128 broadcast reference level (-23 LUFS)
pub const EBU_R128_BROADCAST_LUFS: f64 = -23.0;

/// Common streaming platform reference level (-14 LUFS)
pub const STREAMING_TARGET_LUFS: f64 = -14.0;
