//! Capture session boundary
//!
//! Defines the interface to the camera device. The encoder behind it is
//! an external capability; this module only pins down the contract the
//! supervisor relies on.

pub mod camera;

use crate::config::RecordingFormat;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use camera::CameraSession;

/// Errors that can occur at the capture boundary
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The camera device could not be claimed (absent or in use).
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The requested format/resolution/frame-rate combination could not
    /// be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A hardware or stream error surfaced mid-recording.
    #[error("device fault: {0}")]
    DeviceFault(String),

    #[error("already recording")]
    AlreadyRecording,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Device claimed, not yet streaming
    Idle,
    /// Streaming encoded output to the file
    Recording,
    /// Stream ended, device released
    Stopped,
}

/// An open camera device bound to one output file.
///
/// Sessions move Idle → Recording → Stopped. `stop` is idempotent so the
/// supervisor can call it from any exit path.
#[async_trait]
pub trait CaptureSession: Send {
    /// Begin streaming encoded output to `path`.
    async fn start_recording(&mut self, path: &Path, format: RecordingFormat)
        -> CaptureResult<()>;

    /// Bounded liveness wait. Returns `Ok(())` if the session stayed
    /// healthy for up to `timeout`, or the fault the device reported.
    async fn wait(&mut self, timeout: Duration) -> CaptureResult<()>;

    /// End the stream, flush and close the output file, release the
    /// device. Stopping an already-stopped session is a no-op.
    async fn stop(&mut self) -> CaptureResult<()>;

    /// Current lifecycle state
    fn state(&self) -> SessionState;
}
