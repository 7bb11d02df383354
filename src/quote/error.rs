//! Projection error types
//!
//! Errors raised while turning raw backend payloads into display values.

use thiserror::Error;

/// Errors that can occur while projecting a payload
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Payload is not JSON or lacks `data.amount`
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// `data.amount` is present but not a usable price
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// `captureTime` is not a non-negative integer
    #[error("Invalid capture time: {0}")]
    InvalidCaptureTime(String),

    /// An archive entry failed to project, discarding the batch
    #[error("Archive entry {index} (captureTime {capture_time}) failed: {source}")]
    Entry {
        index: usize,
        /// The raw `captureTime` JSON, which may itself be the bad field
        capture_time: String,
        #[source]
        source: Box<ProjectionError>,
    },
}

impl From<serde_json::Error> for ProjectionError {
    fn from(err: serde_json::Error) -> Self {
        ProjectionError::Malformed(err.to_string())
    }
}

/// Result type alias for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;
