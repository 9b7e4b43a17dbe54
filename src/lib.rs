//! camrec - bounded camera recording.
//!
//! Records from a camera device to a timestamped file until a duration
//! or size cap is reached, or the user interrupts.

pub mod capture;
pub mod config;
pub mod error;
pub mod output;
pub mod recorder;

use capture::{CameraSession, CaptureSession};
use chrono::Local;
use config::RecordingConfig;
use error::RecorderResult;
use output::OutputTarget;
use recorder::{RecordingOutcome, Supervisor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` wins over the verbosity flag
/// when set.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "camrec=debug" } else { "camrec=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run one recording to completion or interrupt.
pub async fn run(config: RecordingConfig) -> RecorderResult<()> {
    tracing::debug!("starting camrec v{}", env!("CARGO_PKG_VERSION"));

    output::ensure_output_dir(&config.output_dir);
    let target = OutputTarget::build(&config, Local::now());

    let mut session = CameraSession::open(&config)?;
    session.start_recording(&target.path, config.format).await?;

    let supervisor = Supervisor::new(config.duration_cap(), config.max_size_bytes());
    match supervisor.run(&mut session, &target.path).await {
        RecordingOutcome::Completed(summary) => {
            tracing::info!(
                "recording complete\n\tpath: {}\n\tsize: {:.2}Mb\n\tduration: {:.2} seconds",
                summary.path.display(),
                summary.size_mb(),
                summary.elapsed.as_secs_f64()
            );
        }
        RecordingOutcome::Interrupted => {}
    }

    Ok(())
}
