//! Error types for the talkback gateway

use thiserror::Error;

/// Result type alias for talkback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the talkback gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone capture error
    #[error("capture error: {0}")]
    Capture(String),

    /// Audio device or codec error
    #[error("audio error: {0}")]
    Audio(String),

    /// Audio upload to the transcription service failed
    #[error("upload error: {0}")]
    Upload(String),

    /// Transcription job could not be created
    #[error("job creation error: {0}")]
    JobCreation(String),

    /// Transcription job reached a terminal failure
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Transcription job did not finish within the poll budget
    #[error("transcription timed out: {0}")]
    TranscriptionTimeout(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio artifact could not be published
    #[error("publish error: {0}")]
    Publish(String),

    /// Chat history error
    #[error("history error: {0}")]
    History(String),

    /// Pipeline error
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
