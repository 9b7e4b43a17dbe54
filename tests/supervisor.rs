//! Supervisor control-loop tests against a mock capture session.
//!
//! The mock grows a real file on disk during each wait, so the
//! supervisor's size measurement goes through the filesystem exactly as
//! it does with a live camera.

use async_trait::async_trait;
use camrec::capture::{CaptureError, CaptureResult, CaptureSession, SessionState};
use camrec::config::RecordingFormat;
use camrec::recorder::{RecordingOutcome, RecordingSummary, Supervisor};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Capture session stand-in that appends bytes to the output file on
/// every wait.
struct MockSession {
    state: SessionState,
    path: Option<PathBuf>,
    bytes_per_wait: usize,
    fault_every_wait: bool,
    stop_transitions: usize,
}

impl MockSession {
    fn new(bytes_per_wait: usize) -> Self {
        Self {
            state: SessionState::Idle,
            path: None,
            bytes_per_wait,
            fault_every_wait: false,
            stop_transitions: 0,
        }
    }

    fn faulting(bytes_per_wait: usize) -> Self {
        Self {
            fault_every_wait: true,
            ..Self::new(bytes_per_wait)
        }
    }
}

#[async_trait]
impl CaptureSession for MockSession {
    async fn start_recording(
        &mut self,
        path: &Path,
        _format: RecordingFormat,
    ) -> CaptureResult<()> {
        std::fs::File::create(path)?;
        self.path = Some(path.to_path_buf());
        self.state = SessionState::Recording;
        Ok(())
    }

    async fn wait(&mut self, _timeout: Duration) -> CaptureResult<()> {
        if self.state != SessionState::Recording {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
        if self.bytes_per_wait > 0 {
            let path = self.path.as_ref().expect("recording started");
            let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
            file.write_all(&vec![0u8; self.bytes_per_wait])?;
        }
        if self.fault_every_wait {
            return Err(CaptureError::DeviceFault("injected fault".to_string()));
        }
        Ok(())
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        if self.state != SessionState::Stopped {
            self.stop_transitions += 1;
            self.state = SessionState::Stopped;
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

fn fast_supervisor(duration_cap: Duration, max_size_bytes: u64) -> Supervisor {
    Supervisor::new(duration_cap, max_size_bytes)
        .with_poll_interval(Duration::from_millis(5))
        .with_wait_timeout(Duration::from_millis(5))
}

async fn run_to_summary(
    supervisor: Supervisor,
    session: &mut MockSession,
    path: &Path,
) -> RecordingSummary {
    session
        .start_recording(path, RecordingFormat::H264)
        .await
        .unwrap();
    match supervisor.run(session, path).await {
        RecordingOutcome::Completed(summary) => summary,
        RecordingOutcome::Interrupted => panic!("expected completion"),
    }
}

#[tokio::test]
async fn duration_cap_terminates_healthy_session() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("out.h264");
    let mut session = MockSession::new(16);

    let cap = Duration::from_millis(150);
    let supervisor = fast_supervisor(cap, u64::MAX);
    let summary = run_to_summary(supervisor, &mut session, &path).await;

    assert!(summary.elapsed >= cap);
    // Termination within the cap plus a few poll intervals.
    assert!(summary.elapsed < cap + Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(summary.path, path);
}

#[tokio::test]
async fn size_cap_wins_when_reached_first() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("out.h264");
    let mut session = MockSession::new(1024);

    let duration_cap = Duration::from_secs(60);
    let supervisor = fast_supervisor(duration_cap, 4096);
    let summary = run_to_summary(supervisor, &mut session, &path).await;

    assert!(summary.size_bytes >= 4096);
    assert!(summary.elapsed < duration_cap);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn faulting_session_still_completes_via_size_cap() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("out.h264");
    // Every wait reports a device fault, but the file keeps growing:
    // faults are non-fatal and the size cap must still end the run.
    let mut session = MockSession::faulting(1024);

    let supervisor = fast_supervisor(Duration::from_secs(60), 4096);
    let summary = run_to_summary(supervisor, &mut session, &path).await;

    assert!(summary.size_bytes >= 4096);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn missing_output_file_counts_as_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("never-created.h264");
    let mut session = MockSession::new(0);
    session.state = SessionState::Recording;

    let supervisor = fast_supervisor(Duration::from_millis(50), 1024);
    let outcome = supervisor.run(&mut session, &path).await;

    match outcome {
        RecordingOutcome::Completed(summary) => assert_eq!(summary.size_bytes, 0),
        RecordingOutcome::Interrupted => panic!("expected completion"),
    }
}

#[tokio::test]
async fn stop_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("out.h264");
    let mut session = MockSession::new(16);
    session
        .start_recording(&path, RecordingFormat::H264)
        .await
        .unwrap();

    session.stop().await.unwrap();
    session.stop().await.unwrap();

    assert_eq!(session.stop_transitions, 1);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn summary_reports_size_in_megabytes() {
    let summary = RecordingSummary {
        path: PathBuf::from("/rec/out.h264"),
        size_bytes: 3 * 1024 * 1024 / 2,
        elapsed: Duration::from_secs(2),
    };
    assert!((summary.size_mb() - 1.5).abs() < f64::EPSILON);
}
