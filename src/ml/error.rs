//! Error types for artifact loading and service startup

use crate::ml::artifact::ResolutionFailure;
use std::path::PathBuf;

/// Result type for artifact loading
pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;

/// Errors raised while materializing a model artifact into a session
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// A required file is absent from the artifact directory
    #[error("Missing artifact file: {}", .0.display())]
    MissingFile(PathBuf),

    /// `config.json` could not be read or parsed
    #[error("Invalid model config {}: {message}", .path.display())]
    InvalidConfig { path: PathBuf, message: String },

    /// Tokenizer could not be built or configured
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Weights could not be mapped or the encoder could not be built
    #[error("Weights error: {0}")]
    Weights(String),

    /// The label mapping is empty, sparse, or inconsistent
    #[error("Label set error: {0}")]
    Labels(String),

    /// The classifier output width disagrees with the label set
    #[error("Classifier head does not match {labels} labels: {message}")]
    ClassifierHead { labels: usize, message: String },

    /// The requested compute device is unavailable
    #[error("Device error: {0}")]
    Device(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for ArtifactError {
    fn from(err: candle_core::Error) -> Self {
        ArtifactError::Weights(err.to_string())
    }
}

/// Errors that prevent the service from ever serving a request
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Device selection failed before any candidate was tried
    #[error("Failed to initialize compute device: {0}")]
    Device(#[source] ArtifactError),

    /// No candidate directory yielded a loadable artifact
    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),
}
