//! Error types for loudness measurement

use mastering_core::MasteringError;
use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur during loudness measurement
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1 or 2)")]
    InvalidChannelCount(u32),

    /// EBU R128 analysis error
    #[error("EBU R128 analysis failed: {0}")]
    AnalysisError(String),

    /// No samples were provided for analysis
    #[error("No audio samples provided for analysis")]
    NoSamples,

    /// Every gating block fell below the absolute or relative gate
    #[error("Audio is silent (no loudness data available)")]
    SilentAudio,
}

impl From<ebur128::Error> for LoudnessError {
    fn from(err: ebur128::Error) -> Self {
        Self::AnalysisError(format!("{:?}", err))
    }
}

impl From<LoudnessError> for MasteringError {
    fn from(err: LoudnessError) -> Self {
        match err {
            LoudnessError::NoSamples | LoudnessError::SilentAudio => MasteringError::SilentInput,
            LoudnessError::InvalidSampleRate(_) | LoudnessError::InvalidChannelCount(_) => {
                MasteringError::config(err.to_string())
            }
            LoudnessError::AnalysisError(msg) => MasteringError::invalid_state(msg),
        }
    }
}
