//! Camera adapter over the `raspistill` / `raspivid` command-line tools.
//!
//! Stills are one blocking `raspistill` run.  Recordings are a
//! `raspivid` child writing raw H.264 to the temp file and the inline
//! motion vectors to its stdout; a reader thread decodes one vector frame
//! at a time and feeds it to the [`MotionAnalyzer`].
//!
//! ```text
//!   raspivid ──-o──▶ /tmp/<stamp>.h264
//!      │
//!      └──-x - ──▶ stdout ──▶ vector thread ──▶ MotionAnalyzer::observe
//! ```
//!
//! Both tools are asked for greyscale output (`-cfx 128:128`, the IR
//! image carries no colour) and a date/time annotation that the firmware
//! refreshes on every frame, so [`CameraPort::annotate`] has nothing to
//! do on this camera.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::ports::{CameraPort, PhotoSettings, VideoSettings};
use crate::config::CameraConfig;
use crate::error::CaptureError;
use crate::motion::vectors::{MotionFrame, VectorGrid};
use crate::motion::MotionAnalyzer;

/// Monochrome colour effect (U:V = 128:128).
const GREYSCALE: &str = "128:128";
/// `-a` flags: 4 = time, 8 = date.
const ANNOTATE_DATE_TIME: &str = "12";
/// Still preview time before capture, in ms.
const STILL_TIMEOUT_MS: &str = "1000";

struct Recording {
    child: Child,
    reader: Option<JoinHandle<u32>>,
}

pub struct RaspiCamera {
    still_command: PathBuf,
    video_command: PathBuf,
    /// Clock origin for motion timestamps; matches the service clock.
    epoch: Instant,
    recording: Option<Recording>,
}

impl RaspiCamera {
    pub fn new(config: &CameraConfig, epoch: Instant) -> Self {
        Self {
            still_command: config.still_command.clone(),
            video_command: config.video_command.clone(),
            epoch,
            recording: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }
}

impl CameraPort for RaspiCamera {
    fn capture_photo(&mut self, path: &Path, settings: &PhotoSettings) -> Result<(), CaptureError> {
        if self.recording.is_some() {
            return Err(CaptureError::CameraUnavailable("recording in progress".into()));
        }
        let status = Command::new(&self.still_command)
            .arg("-o")
            .arg(path)
            .args(["-w", &settings.resolution.width.to_string()])
            .args(["-h", &settings.resolution.height.to_string()])
            .args(["-rot", &settings.rotation.to_string()])
            .args(["-cfx", GREYSCALE])
            .args(["-a", ANNOTATE_DATE_TIME, "-a", &settings.annotation])
            .args(["-ae", "40,0xff,0x808000"])
            .args(["-t", STILL_TIMEOUT_MS, "-n"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))?;
        if !status.success() {
            return Err(CaptureError::ToolFailed(status.to_string()));
        }
        Ok(())
    }

    fn start_recording(
        &mut self,
        raw_path: &Path,
        settings: &VideoSettings,
        analyzer: MotionAnalyzer,
    ) -> Result<(), CaptureError> {
        if self.recording.is_some() {
            return Err(CaptureError::CameraUnavailable("already recording".into()));
        }
        let mut child = Command::new(&self.video_command)
            .args(["-t", "0"])
            .args(["-w", &settings.resolution.width.to_string()])
            .args(["-h", &settings.resolution.height.to_string()])
            .args(["-fps", &settings.framerate.to_string()])
            .args(["-rot", &settings.rotation.to_string()])
            .args(["-cfx", GREYSCALE])
            .args(["-a", ANNOTATE_DATE_TIME, "-a", &settings.annotation])
            .args(["-ae", "16"])
            .arg("-o")
            .arg(raw_path)
            .args(["-x", "-", "-n"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))?;

        let reader = match child.stdout.take() {
            Some(stdout) => {
                let grid = VectorGrid::for_resolution(settings.resolution);
                let epoch = self.epoch;
                let spawned = std::thread::Builder::new()
                    .name("motion-vectors".into())
                    .spawn(move || read_vectors(stdout, grid, analyzer, epoch));
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!("CAMERA: vector thread: {e}");
                        None
                    }
                }
            }
            None => {
                warn!("CAMERA: no vector stream, motion analysis disabled");
                None
            }
        };
        info!("CAMERA: recording to {}", raw_path.display());
        self.recording = Some(Recording { child, reader });
        Ok(())
    }

    fn annotate(&mut self, text: &str) {
        debug!("CAMERA: annotation refreshed by firmware ({text})");
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        let Some(mut rec) = self.recording.take() else {
            return Err(CaptureError::NotRecording);
        };
        match rec.child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::InvalidInput => {}
            Err(e) => return Err(CaptureError::Io(e)),
        }
        rec.child.wait().map_err(CaptureError::Io)?;
        if let Some(reader) = rec.reader.take() {
            match reader.join() {
                Ok(frames) => debug!("CAMERA: {frames} vector frames read"),
                Err(_) => warn!("CAMERA: vector thread panicked"),
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.recording.is_some() {
            if let Err(e) = self.stop_recording() {
                warn!("CAMERA: close: {e}");
            }
        }
    }
}

impl Drop for RaspiCamera {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read fixed-size vector frames until the encoder closes its stdout.
fn read_vectors(
    mut stdout: impl Read,
    grid: VectorGrid,
    analyzer: MotionAnalyzer,
    epoch: Instant,
) -> u32 {
    let mut buf = vec![0u8; grid.frame_len()];
    let mut frames = 0;
    loop {
        if let Err(e) = stdout.read_exact(&mut buf) {
            if e.kind() != ErrorKind::UnexpectedEof {
                debug!("CAMERA: vector stream: {e}");
            }
            return frames;
        }
        if let Some(frame) = MotionFrame::decode(&buf, grid) {
            analyzer.observe(&frame, elapsed(epoch));
            frames += 1;
        }
    }
}

fn elapsed(epoch: Instant) -> Duration {
    Instant::now().saturating_duration_since(epoch)
}
