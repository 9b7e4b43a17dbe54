//! Command-line options and recording configuration
//!
//! Parses the CLI into an immutable [`RecordingConfig`]. clap handles
//! syntax (types, enums, arity); semantic validation lives in
//! [`RecordingConfig::from_cli`] so bad numerics fail before any device
//! is opened.

use crate::error::{RecorderError, RecorderResult};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Encoder format for the recording, which also determines the file
/// extension. `h264` and `mjpeg` are encoded streams; `rgb` and `rgba`
/// are raw pixel streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum RecordingFormat {
    H264,
    Rgb,
    Rgba,
    Mjpeg,
}

impl RecordingFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            RecordingFormat::H264 => "h264",
            RecordingFormat::Rgb => "rgb",
            RecordingFormat::Rgba => "rgba",
            RecordingFormat::Mjpeg => "mjpeg",
        }
    }

    /// Whether this format needs an external encoder (vs raw pixel writes)
    pub fn is_encoded(&self) -> bool {
        matches!(self, RecordingFormat::H264 | RecordingFormat::Mjpeg)
    }
}

impl std::fmt::Display for RecordingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Record from a camera until a duration or size cap is reached
#[derive(Parser, Debug)]
#[command(name = "camrec", version, about)]
pub struct Cli {
    /// Output directory for recordings
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encoder format
    #[arg(short, long, value_enum, default_value_t = RecordingFormat::H264)]
    pub format: RecordingFormat,

    /// Camera frame rate in frames per second
    #[arg(long, default_value_t = 30)]
    pub frame_rate: u32,

    /// Camera resolution: width height
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["WIDTH", "HEIGHT"],
        default_values_t = [1280u32, 720u32]
    )]
    pub resolution: Vec<u32>,

    /// Recording duration cap in seconds
    #[arg(short, long, default_value_t = 60.0)]
    pub duration: f64,

    /// Prefix for recording file names, e.g. --prefix drone_1
    #[arg(long)]
    pub prefix: Option<String>,

    /// Max recording file size in megabytes
    #[arg(long, default_value_t = 100)]
    pub max_size: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Immutable configuration for one recording run
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Directory the recording file is written to
    pub output_dir: PathBuf,

    /// Encoder format / file extension
    pub format: RecordingFormat,

    /// Camera frame rate (frames per second)
    pub frame_rate: u32,

    /// Capture width in pixels
    pub width: u32,

    /// Capture height in pixels
    pub height: u32,

    /// Recording duration cap in seconds
    pub duration_secs: f64,

    /// Optional file name prefix
    pub prefix: Option<String>,

    /// File size cap in megabytes
    pub max_size_mb: u64,

    /// Debug-level logging
    pub verbose: bool,
}

impl RecordingConfig {
    /// Validate CLI options into a config. All numeric fields must be
    /// strictly positive.
    pub fn from_cli(cli: Cli) -> RecorderResult<Self> {
        let &[width, height] = cli.resolution.as_slice() else {
            return Err(RecorderError::InvalidArgument(
                "resolution takes exactly two values: width height".to_string(),
            ));
        };
        if width == 0 || height == 0 {
            return Err(RecorderError::InvalidArgument(format!(
                "resolution must be positive, got {width}x{height}"
            )));
        }
        if cli.frame_rate == 0 {
            return Err(RecorderError::InvalidArgument(
                "frame rate must be positive".to_string(),
            ));
        }
        if !cli.duration.is_finite() || cli.duration <= 0.0 {
            return Err(RecorderError::InvalidArgument(format!(
                "duration must be a positive number of seconds, got {}",
                cli.duration
            )));
        }
        if Duration::try_from_secs_f64(cli.duration).is_err() {
            return Err(RecorderError::InvalidArgument(format!(
                "duration of {} seconds is out of range",
                cli.duration
            )));
        }
        if cli.max_size == 0 {
            return Err(RecorderError::InvalidArgument(
                "max size must be at least 1 megabyte".to_string(),
            ));
        }
        if cli.max_size.checked_mul(1024 * 1024).is_none() {
            return Err(RecorderError::InvalidArgument(format!(
                "max size of {} megabytes is out of range",
                cli.max_size
            )));
        }

        let output_dir = cli.output.unwrap_or_else(default_output_dir);

        Ok(Self {
            output_dir,
            format: cli.format,
            frame_rate: cli.frame_rate,
            width,
            height,
            duration_secs: cli.duration,
            prefix: cli.prefix,
            max_size_mb: cli.max_size,
            verbose: cli.verbose,
        })
    }

    /// Duration cap as a [`Duration`]. `from_cli` guarantees the value
    /// is convertible.
    pub fn duration_cap(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }

    /// Size cap in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

/// Default output directory: `~/.recordings`
fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".recordings"))
        .unwrap_or_else(|| PathBuf::from(".recordings"))
}
