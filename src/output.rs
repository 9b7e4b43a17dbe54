//! Output path construction
//!
//! Derives the timestamped output file path for a run and makes sure the
//! output directory exists. The timestamp has second resolution, so two
//! runs started within the same second with the same prefix collide; that
//! limitation is accepted rather than papered over.

use crate::config::RecordingConfig;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// The single output file a recording run writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// Full path: `<output_dir>/[<prefix>_]<timestamp>.<ext>`
    pub path: PathBuf,
}

impl OutputTarget {
    /// Build the output target from the config and a timestamp.
    ///
    /// Taking the timestamp as an argument keeps path construction
    /// deterministic; callers pass `Local::now()`.
    pub fn build(config: &RecordingConfig, now: DateTime<Local>) -> Self {
        let timestamp = now.format("%Y-%m-%d_%H:%M:%S");
        let file_name = match &config.prefix {
            Some(prefix) => format!("{prefix}_{timestamp}.{}", config.format.extension()),
            None => format!("{timestamp}.{}", config.format.extension()),
        };
        tracing::debug!("output filename {}", file_name);

        let path = config.output_dir.join(file_name);
        tracing::debug!("output path {}", path.display());

        Self { path }
    }
}

/// Create the output directory if it is missing.
///
/// Best-effort: a directory that already exists (including one created
/// concurrently by another process) is success, and any other failure is
/// logged with its diagnostic but does not abort the run.
pub fn ensure_output_dir(dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::error!("failed to create output directory {}: {e}", dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cli, RecordingConfig, RecordingFormat};
    use chrono::TimeZone;
    use clap::Parser;

    fn config(args: &[&str]) -> RecordingConfig {
        let cli = Cli::try_parse_from(std::iter::once("camrec").chain(args.iter().copied()))
            .expect("args should parse");
        RecordingConfig::from_cli(cli).expect("config should validate")
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn path_without_prefix() {
        let config = config(&["-o", "/rec"]);
        let target = OutputTarget::build(&config, at(2024, 5, 1, 13, 45, 7));
        assert_eq!(target.path, PathBuf::from("/rec/2024-05-01_13:45:07.h264"));
    }

    #[test]
    fn path_with_prefix_and_format() {
        let config = config(&["-o", "/rec", "--prefix", "drone_1", "-f", "mjpeg"]);
        let target = OutputTarget::build(&config, at(2024, 5, 1, 13, 45, 7));
        assert_eq!(
            target.path,
            PathBuf::from("/rec/drone_1_2024-05-01_13:45:07.mjpeg")
        );
        assert_eq!(config.format, RecordingFormat::Mjpeg);
    }

    #[test]
    fn distinct_seconds_give_distinct_paths() {
        let config = config(&["-o", "/rec", "--prefix", "cam"]);
        let a = OutputTarget::build(&config, at(2024, 5, 1, 13, 45, 7));
        let b = OutputTarget::build(&config, at(2024, 5, 1, 13, 45, 8));
        assert_ne!(a.path, b.path);
    }

    #[test]
    fn same_second_collides() {
        // Known limitation: second-resolution timestamps collide.
        let config = config(&["-o", "/rec", "--prefix", "cam"]);
        let a = OutputTarget::build(&config, at(2024, 5, 1, 13, 45, 7));
        let b = OutputTarget::build(&config, at(2024, 5, 1, 13, 45, 7));
        assert_eq!(a.path, b.path);
    }

    #[test]
    fn ensure_output_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("recordings");
        ensure_output_dir(&dir);
        assert!(dir.is_dir());
        // Second call against an existing directory is a no-op success.
        ensure_output_dir(&dir);
        assert!(dir.is_dir());
    }
}
