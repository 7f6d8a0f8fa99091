/// Core error types for the mastering chain
use thiserror::Error;

/// Result type alias using `MasteringError`
pub type Result<T> = std::result::Result<T, MasteringError>;

/// Error type shared by every stage of the mastering chain
#[derive(Error, Debug)]
pub enum MasteringError {
    /// Decode, encode or file access failure. Fatal, never retried.
    #[error("I/O error: {0}")]
    Io(String),

    /// Out-of-range or inconsistent configuration, rejected before processing
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Loudness measurement found no usable gated content
    #[error("Input is silent: integrated loudness cannot be measured")]
    SilentInput,

    /// Cooperative cancellation observed at a chunk boundary
    #[error("Processing was cancelled")]
    Cancelled,

    /// Operation not allowed in the pipeline's current state, or a block that
    /// does not match the stream it belongs to
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl MasteringError {
    /// Create an I/O error
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether this error is the cooperative-cancellation signal rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for MasteringError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
