//! Camera capture session using nokhwa
//!
//! The camera is owned by a dedicated capture thread; nokhwa blocks on
//! frame delivery, so the camera controls the pacing. Encoded formats
//! (h264, mjpeg) are produced by an ffmpeg child process fed raw frames
//! over stdin; raw formats (rgb, rgba) are decoded in-process and written
//! straight to the output file.

use super::{CaptureError, CaptureResult, CaptureSession, SessionState};
use crate::config::{RecordingConfig, RecordingFormat};
use async_trait::async_trait;
use nokhwa::pixel_format::{RgbAFormat, RgbFormat};
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Buffer, Camera};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// ffmpeg encoder writing an h264 or mjpeg stream to the output file
struct FfmpegEncoder {
    process: Child,
    frame_count: u64,
}

impl FfmpegEncoder {
    fn spawn(
        format: RecordingFormat,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
        camera_format: FrameFormat,
    ) -> CaptureResult<Self> {
        let mut args: Vec<String> = vec!["-y".into()];

        // Input: raw frames from stdin in the camera's native format.
        // MJPEG cameras deliver compressed JPEG frames, not rawvideo.
        if camera_format == FrameFormat::MJPEG {
            args.extend(["-f".into(), "mjpeg".into()]);
        } else {
            let pix_fmt = match camera_format {
                FrameFormat::YUYV => "yuyv422",
                FrameFormat::NV12 => "nv12",
                FrameFormat::RAWRGB => "rgb24",
                _ => {
                    tracing::warn!(
                        "unknown camera format {:?}, assuming yuyv422",
                        camera_format
                    );
                    "yuyv422"
                }
            };
            args.extend([
                "-f".into(),
                "rawvideo".into(),
                "-pixel_format".into(),
                pix_fmt.into(),
                "-video_size".into(),
                format!("{width}x{height}"),
            ]);
        }
        args.extend(["-framerate".into(), fps.to_string(), "-i".into(), "-".into()]);

        // Output: a raw elementary stream matching the file extension.
        match format {
            RecordingFormat::H264 => args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                "veryfast".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-f".into(),
                "h264".into(),
            ]),
            RecordingFormat::Mjpeg => args.extend([
                "-c:v".into(),
                "mjpeg".into(),
                "-q:v".into(),
                "4".into(),
                "-f".into(),
                "mjpeg".into(),
            ]),
            RecordingFormat::Rgb | RecordingFormat::Rgba => {
                return Err(CaptureError::Encoding(
                    "raw formats do not use the external encoder".to_string(),
                ))
            }
        }
        args.push(path.to_string_lossy().into_owned());

        let process = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CaptureError::Encoding(format!("failed to start ffmpeg: {e}")))?;

        tracing::info!(
            "started ffmpeg encoder: {}x{} @ {}fps, input {:?} -> {}",
            width,
            height,
            fps,
            camera_format,
            path.display()
        );

        Ok(Self {
            process,
            frame_count: 0,
        })
    }

    fn write_frame(&mut self, data: &[u8]) -> CaptureResult<()> {
        let stdin = self
            .process
            .stdin
            .as_mut()
            .ok_or_else(|| CaptureError::Encoding("ffmpeg stdin closed".to_string()))?;
        stdin.write_all(data)?;
        self.frame_count += 1;
        Ok(())
    }

    fn finish(mut self) -> CaptureResult<()> {
        // Close stdin to signal EOF, then let ffmpeg flush and exit.
        drop(self.process.stdin.take());
        let output = self
            .process
            .wait_with_output()
            .map_err(|e| CaptureError::Encoding(format!("failed to wait for ffmpeg: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::Encoding(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        tracing::debug!("ffmpeg encoder finished after {} frames", self.frame_count);
        Ok(())
    }
}

/// Destination for captured frames
enum FrameSink {
    /// h264/mjpeg via the external encoder
    Encoded(FfmpegEncoder),
    /// Raw decoded rgb24 frames
    RawRgb(BufWriter<File>),
    /// Raw decoded rgba frames
    RawRgba(BufWriter<File>),
}

impl FrameSink {
    fn open(
        format: RecordingFormat,
        path: &Path,
        camera_format: CameraFormat,
    ) -> CaptureResult<Self> {
        match format {
            RecordingFormat::H264 | RecordingFormat::Mjpeg => Ok(Self::Encoded(
                FfmpegEncoder::spawn(
                    format,
                    path,
                    camera_format.resolution().width(),
                    camera_format.resolution().height(),
                    camera_format.frame_rate(),
                    camera_format.format(),
                )?,
            )),
            RecordingFormat::Rgb => Ok(Self::RawRgb(BufWriter::new(File::create(path)?))),
            RecordingFormat::Rgba => Ok(Self::RawRgba(BufWriter::new(File::create(path)?))),
        }
    }

    fn write_frame(&mut self, frame: &Buffer) -> CaptureResult<()> {
        match self {
            Self::Encoded(encoder) => encoder.write_frame(frame.buffer()),
            Self::RawRgb(writer) => {
                let image = frame
                    .decode_image::<RgbFormat>()
                    .map_err(|e| CaptureError::DeviceFault(format!("frame decode failed: {e}")))?;
                writer.write_all(image.as_raw())?;
                Ok(())
            }
            Self::RawRgba(writer) => {
                let image = frame
                    .decode_image::<RgbAFormat>()
                    .map_err(|e| CaptureError::DeviceFault(format!("frame decode failed: {e}")))?;
                writer.write_all(image.as_raw())?;
                Ok(())
            }
        }
    }

    fn finish(self) -> CaptureResult<()> {
        match self {
            Self::Encoded(encoder) => encoder.finish(),
            Self::RawRgb(mut writer) | Self::RawRgba(mut writer) => {
                writer.flush()?;
                Ok(())
            }
        }
    }
}

/// A camera device claimed for one recording run
pub struct CameraSession {
    index: CameraIndex,
    width: u32,
    height: u32,
    frame_rate: u32,
    state: SessionState,
    stop_flag: Arc<AtomicBool>,
    faults: Option<mpsc::UnboundedReceiver<CaptureError>>,
    capture_thread: Option<std::thread::JoinHandle<()>>,
}

impl CameraSession {
    /// Claim the default camera device for the configured resolution and
    /// frame rate. Fails if no camera can be found.
    pub fn open(config: &RecordingConfig) -> CaptureResult<Self> {
        let cameras = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        if cameras.is_empty() {
            return Err(CaptureError::DeviceUnavailable(
                "no cameras found".to_string(),
            ));
        }
        for info in &cameras {
            tracing::debug!("camera {:?}: {}", info.index(), info.human_name());
        }
        let index = cameras[0].index().clone();

        tracing::debug!(
            "recording resolution {}x{} @ {}fps",
            config.width,
            config.height,
            config.frame_rate
        );

        Ok(Self {
            index,
            width: config.width,
            height: config.height,
            frame_rate: config.frame_rate,
            state: SessionState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            faults: None,
            capture_thread: None,
        })
    }
}

#[async_trait]
impl CaptureSession for CameraSession {
    async fn start_recording(
        &mut self,
        path: &Path,
        format: RecordingFormat,
    ) -> CaptureResult<()> {
        match self.state {
            SessionState::Recording => return Err(CaptureError::AlreadyRecording),
            SessionState::Stopped => {
                return Err(CaptureError::DeviceUnavailable(
                    "session already stopped".to_string(),
                ))
            }
            SessionState::Idle => {}
        }

        if format.is_encoded() && Command::new("ffmpeg").arg("-version").output().is_err() {
            return Err(CaptureError::Encoding(
                "ffmpeg not found on PATH; required for h264/mjpeg output".to_string(),
            ));
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        self.faults = Some(fault_rx);

        let requested = CameraFormat::new(
            Resolution::new(self.width, self.height),
            FrameFormat::YUYV,
            self.frame_rate,
        );
        let index = self.index.clone();
        let stop_flag = self.stop_flag.clone();
        let path = path.to_path_buf();

        let handle = std::thread::spawn(move || {
            capture_loop(index, requested, path, format, stop_flag, ready_tx, fault_tx);
        });
        self.capture_thread = Some(handle);

        match ready_rx.await {
            Ok(Ok(())) => {
                self.state = SessionState::Recording;
                Ok(())
            }
            Ok(Err(e)) => {
                if let Some(handle) = self.capture_thread.take() {
                    let _ = handle.join();
                }
                Err(e)
            }
            Err(_) => {
                if let Some(handle) = self.capture_thread.take() {
                    let _ = handle.join();
                }
                Err(CaptureError::DeviceFault(
                    "capture thread exited before startup".to_string(),
                ))
            }
        }
    }

    async fn wait(&mut self, timeout: Duration) -> CaptureResult<()> {
        if self.state != SessionState::Recording {
            return Ok(());
        }
        let Some(faults) = self.faults.as_mut() else {
            return Ok(());
        };
        match tokio::time::timeout(timeout, faults.recv()).await {
            Ok(Some(fault)) => Err(fault),
            // Sender gone without a stop: the capture thread died.
            Ok(None) => Err(CaptureError::DeviceFault(
                "capture thread terminated unexpectedly".to_string(),
            )),
            Err(_elapsed) => Ok(()),
        }
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }
        self.stop_flag.store(true, Ordering::SeqCst);
        // The capture thread finalizes the sink before exiting.
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
        self.state = SessionState::Stopped;
        tracing::info!("capture session stopped");
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Body of the capture thread: open the camera, stream frames into the
/// sink until the stop flag is set, then finalize.
fn capture_loop(
    index: CameraIndex,
    requested: CameraFormat,
    path: PathBuf,
    format: RecordingFormat,
    stop_flag: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<CaptureResult<()>>,
    fault_tx: mpsc::UnboundedSender<CaptureError>,
) {
    let requested_format =
        RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(requested));

    let mut camera = match Camera::new(index.clone(), requested_format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
                "failed to open camera {index:?}: {e}"
            ))));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
            "failed to open camera stream: {e}"
        ))));
        return;
    }

    let actual = camera.camera_format();
    tracing::info!(
        "camera opened: {}x{} @ {}fps, format {:?} (requested {}x{} @ {}fps)",
        actual.resolution().width(),
        actual.resolution().height(),
        actual.frame_rate(),
        actual.format(),
        requested.resolution().width(),
        requested.resolution().height(),
        requested.frame_rate()
    );

    let mut sink = match FrameSink::open(format, &path, actual) {
        Ok(sink) => sink,
        Err(e) => {
            let _ = camera.stop_stream();
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));

    while !stop_flag.load(Ordering::SeqCst) {
        // Blocks until the camera delivers the next frame; the camera
        // controls the pacing.
        match camera.frame() {
            Ok(frame) => {
                if let Err(e) = sink.write_frame(&frame) {
                    let _ = fault_tx.send(e);
                }
            }
            Err(e) => {
                let _ = fault_tx.send(CaptureError::DeviceFault(e.to_string()));
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!("error stopping camera stream: {e}");
    }
    if let Err(e) = sink.finish() {
        tracing::warn!("error finalizing output: {e}");
    }
}
