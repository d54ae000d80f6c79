//! Error types for voxline.

use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Audio adapter errors. These never cross the adapter boundary: the
/// offending chunk is dropped and the error logged.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("base64 decode failed: {0}")]
    Base64(String),

    #[error("wav decode failed: {0}")]
    WavDecode(String),

    #[error("resampler error: {0}")]
    Resample(String),
}

/// Call session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to initialize pipeline: {0}")]
    Init(String),

    #[error("a pipeline is already live for call {0}")]
    CallInProgress(String),
}
