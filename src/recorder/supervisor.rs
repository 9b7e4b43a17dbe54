//! Recording supervisor
//!
//! The control loop for a recording run. Each iteration checks elapsed
//! time and on-disk file size against the configured caps, then performs
//! a bounded wait on the capture session (racing a ctrl-c interrupt)
//! followed by a short fixed sleep. Whichever cap is satisfied first ends
//! the run; faults reported by the session are logged and the loop keeps
//! going.

use super::state::{RecordingOutcome, RecordingSummary};
use crate::capture::CaptureSession;
use std::path::Path;
use std::time::{Duration, Instant};

/// Pause between consecutive cap checks. Bounds the worst-case overshoot
/// of the duration/size caps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on each liveness wait against the capture session.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Supervises one recording run against its caps
pub struct Supervisor {
    duration_cap: Duration,
    max_size_bytes: u64,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl Supervisor {
    pub fn new(duration_cap: Duration, max_size_bytes: u64) -> Self {
        Self {
            duration_cap,
            max_size_bytes,
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    /// Override the poll interval (shortens cap overshoot; mostly for
    /// tests).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the session wait bound.
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Drive the session until a cap is reached or the user interrupts.
    ///
    /// The file size is an external measurement of the growing output
    /// file and lags the encoder by up to one poll interval.
    pub async fn run(
        &self,
        session: &mut dyn CaptureSession,
        output_path: &Path,
    ) -> RecordingOutcome {
        let start = Instant::now();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let elapsed = loop {
            let elapsed = start.elapsed();
            let size = file_size(output_path);
            tracing::debug!(
                "duration: {:.3}s, size: {} bytes",
                elapsed.as_secs_f64(),
                size
            );

            // Inclusive whichever-comes-first race between the two caps.
            if elapsed >= self.duration_cap || size >= self.max_size_bytes {
                break elapsed;
            }

            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("stopping recording");
                    if let Err(e) = session.stop().await {
                        tracing::error!("error stopping session: {e}");
                    }
                    return RecordingOutcome::Interrupted;
                }
                result = session.wait(self.wait_timeout) => {
                    if let Err(fault) = result {
                        // Deliberately non-fatal: transient device hiccups
                        // do not kill the recording attempt.
                        tracing::error!("capture session fault: {fault}");
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        };

        if let Err(e) = session.stop().await {
            tracing::error!("error stopping session: {e}");
        }

        // Re-read after stop so the flushed size is reported.
        RecordingOutcome::Completed(RecordingSummary {
            path: output_path.to_path_buf(),
            size_bytes: file_size(output_path),
            elapsed,
        })
    }
}

/// Size of the output file on disk; a file that does not exist yet
/// counts as empty.
fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
