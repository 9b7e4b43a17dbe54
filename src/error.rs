//! Error types and handling
//!
//! Top-level error taxonomy for the recorder.

use crate::capture::CaptureError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
