//! Recording outcome and summary types

use std::path::PathBuf;
use std::time::Duration;

/// How a recording run ended
#[derive(Debug)]
pub enum RecordingOutcome {
    /// A cap (duration or size) was reached; summary available.
    Completed(RecordingSummary),
    /// The user interrupted the run; no summary is produced.
    Interrupted,
}

/// Result of a completed recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    /// Path of the recording file
    pub path: PathBuf,

    /// Final file size in bytes
    pub size_bytes: u64,

    /// Elapsed wall-clock recording time
    pub elapsed: Duration,
}

impl RecordingSummary {
    /// Final file size in megabytes
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}
