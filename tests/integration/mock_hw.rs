//! Mock adapters for integration tests.
//!
//! Every port call is recorded so tests can assert on the full command
//! history without a camera, GPIO lines, a modem or a mail relay.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDateTime;
use image::{Rgb, RgbImage};
use tempfile::TempDir;

use picam::app::events::AppEvent;
use picam::app::ports::{
    CameraPort, Clock, EventSink, FrameSourcePort, IlluminationPort, LinkPort, MailTransport,
    ModemPowerPort, MotionSensorPort, NotifyPort, PhotoSettings, TelemetryPort, TranscoderPort,
    VideoSettings,
};
use picam::config::{Resolution, SystemConfig};
use picam::error::{
    ActuatorError, CaptureError, ConversionError, DeliveryError, Interrupted, LinkError,
    MosaicError,
};
use picam::motion::{MotionAnalyzer, MotionFrame, MotionVector};
use picam::notify::mail::PreviewMail;
use picam::notify::{NotifyOutcome, NotifyRequest};
use picam::sensors::TelemetryReading;

// ── Config ────────────────────────────────────────────────────

/// Defaults with data and scratch directories inside `dir`, small
/// previews, no cooldown.
pub fn test_config(dir: &TempDir) -> SystemConfig {
    let mut config = SystemConfig::default();
    config.base.data_dir = dir.path().join("data");
    config.base.tmp_dir = dir.path().join("tmp");
    std::fs::create_dir_all(&config.base.data_dir).unwrap();
    std::fs::create_dir_all(&config.base.tmp_dir).unwrap();
    config.base.cooldown_secs = 0;
    config.camera.preview_res = Resolution::new(16, 12);
    config
}

/// A frame in which every block moves well above the default thresholds.
pub fn moving_frame() -> MotionFrame {
    MotionFrame::new(vec![MotionVector::new(100, 100); 64])
}

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Illumination(bool),
    Photo(PathBuf),
    StartRecording(PathBuf),
    Annotate,
    StopRecording,
    Transcode { raw: PathBuf, out: PathBuf },
    FrameCount,
    FrameAt(u64),
    Close,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    /// Motion sensor level.
    pub level: bool,
    pub photo_fails: bool,
    pub recording_fails: bool,
    pub transcode_fails: bool,
    /// Motion frames fed to the analyzer, one per annotation refresh,
    /// starting with the first refresh of each recording.
    pub motion_frames: u32,
    pub total_frames: u64,
    pub telemetry: TelemetryReading,
    analyzer: Option<MotionAnalyzer>,
    refreshes: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            level: true,
            photo_fails: false,
            recording_fails: false,
            transcode_fails: false,
            motion_frames: 0,
            total_frames: 300,
            telemetry: TelemetryReading {
                battery_percent: Some(80),
                battery_volts: Some(12.4),
                cpu_temp_c: Some(48.0),
                disk_percent: Some(12.0),
            },
            analyzer: None,
            refreshes: 0,
        }
    }

    pub fn ir_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                HwCall::Illumination(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn is_recording(&self) -> bool {
        self.analyzer.is_some()
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn transcoded(&self) -> bool {
        self.calls.iter().any(|c| matches!(c, HwCall::Transcode { .. }))
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSensorPort for MockHardware {
    fn read_level(&mut self) -> bool {
        self.level
    }
}

impl IlluminationPort for MockHardware {
    fn set_illumination(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.calls.push(HwCall::Illumination(on));
        Ok(())
    }
}

impl CameraPort for MockHardware {
    fn capture_photo(&mut self, path: &Path, _settings: &PhotoSettings) -> Result<(), CaptureError> {
        self.calls.push(HwCall::Photo(path.to_path_buf()));
        if self.photo_fails {
            return Err(CaptureError::ToolFailed("exit status: 70".into()));
        }
        Ok(())
    }

    fn start_recording(
        &mut self,
        raw_path: &Path,
        _settings: &VideoSettings,
        analyzer: MotionAnalyzer,
    ) -> Result<(), CaptureError> {
        self.calls.push(HwCall::StartRecording(raw_path.to_path_buf()));
        if self.recording_fails {
            return Err(CaptureError::CameraUnavailable("mmal: no camera".into()));
        }
        std::fs::write(raw_path, b"raw h264")?;
        self.analyzer = Some(analyzer);
        self.refreshes = 0;
        Ok(())
    }

    fn annotate(&mut self, _text: &str) {
        self.calls.push(HwCall::Annotate);
        if let Some(analyzer) = &self.analyzer {
            if self.refreshes < self.motion_frames {
                analyzer.observe(&moving_frame(), Duration::from_secs(u64::from(self.refreshes)));
            }
        }
        self.refreshes += 1;
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        if self.analyzer.take().is_none() {
            return Err(CaptureError::NotRecording);
        }
        self.calls.push(HwCall::StopRecording);
        Ok(())
    }

    fn close(&mut self) {
        self.calls.push(HwCall::Close);
    }
}

impl TranscoderPort for MockHardware {
    fn transcode(&mut self, raw: &Path, out: &Path, _framerate: u32) -> Result<(), ConversionError> {
        self.calls.push(HwCall::Transcode {
            raw: raw.to_path_buf(),
            out: out.to_path_buf(),
        });
        if self.transcode_fails {
            return Err(ConversionError::ExitStatus("exit status: 1".into()));
        }
        std::fs::write(out, b"mp4").map_err(ConversionError::Spawn)
    }
}

impl FrameSourcePort for MockHardware {
    fn frame_count(&mut self, _video: &Path) -> Result<u64, MosaicError> {
        self.calls.push(HwCall::FrameCount);
        Ok(self.total_frames)
    }

    fn frame_at(&mut self, _video: &Path, index: u64) -> Result<RgbImage, MosaicError> {
        self.calls.push(HwCall::FrameAt(index));
        Ok(RgbImage::from_pixel(8, 6, Rgb([(index % 256) as u8, 40, 40])))
    }
}

impl TelemetryPort for MockHardware {
    fn sample(&mut self) -> TelemetryReading {
        self.telemetry
    }
}

// ── FakeClock ─────────────────────────────────────────────────

#[derive(Default)]
struct ClockState {
    uptime: Duration,
    sleeps: Vec<Duration>,
    interrupt_after: Option<usize>,
}

/// Uptime advances only by sleeping.  Optionally reports shutdown once a
/// given number of sleeps has completed.
#[derive(Default)]
pub struct FakeClock {
    state: Mutex<ClockState>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sleep after the first `n` is interrupted.
    pub fn interrupt_after(n: usize) -> Self {
        let clock = Self::default();
        clock.state.lock().unwrap().interrupt_after = Some(n);
        clock
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }

    pub fn slept_at_least(&self, d: Duration) -> bool {
        self.sleeps().iter().any(|s| *s >= d)
    }
}

impl Clock for FakeClock {
    fn uptime(&self) -> Duration {
        self.state.lock().unwrap().uptime
    }

    fn now_local(&self) -> NaiveDateTime {
        let base = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let secs = self.uptime().as_secs() as i64;
        base + chrono::Duration::seconds(secs)
    }

    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let mut state = self.state.lock().unwrap();
        if state
            .interrupt_after
            .is_some_and(|n| state.sleeps.len() >= n)
        {
            return Err(Interrupted);
        }
        state.sleeps.push(duration);
        state.uptime += duration;
        Ok(())
    }
}

// ── MockNotifier ──────────────────────────────────────────────

pub struct MockNotifier {
    pub requests: Vec<NotifyRequest>,
    pub outcome: NotifyOutcome,
    pub shutdowns: u32,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            outcome: NotifyOutcome::Sent,
            shutdowns: 0,
        }
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyPort for MockNotifier {
    fn deliver(&mut self, request: &NotifyRequest) -> NotifyOutcome {
        self.requests.push(request.clone());
        self.outcome
    }

    fn shutdown(&mut self) {
        self.shutdowns += 1;
    }
}

// ── Link, mailer, modem ───────────────────────────────────────

/// Dial-up session whose counter turns non-zero on poll `up_on_poll`
/// (1-based), or never.
#[derive(Default)]
pub struct MockLink {
    pub up_on_poll: Option<u32>,
    pub polls: u32,
    pub spawned: u32,
    pub killed: u32,
    pub locks_removed: u32,
    running: bool,
}

#[allow(dead_code)]
impl MockLink {
    pub fn up_on(poll: u32) -> Self {
        Self {
            up_on_poll: Some(poll),
            ..Self::default()
        }
    }

    pub fn never_up() -> Self {
        Self::default()
    }
}

impl LinkPort for MockLink {
    fn spawn_session(&mut self) -> Result<(), LinkError> {
        self.spawned += 1;
        self.running = true;
        Ok(())
    }

    fn rx_bytes(&mut self) -> Option<u64> {
        self.polls += 1;
        match self.up_on_poll {
            Some(n) if self.polls >= n => Some(2048),
            _ => Some(0),
        }
    }

    fn kill_session(&mut self) -> Result<(), LinkError> {
        if !self.running {
            return Err(LinkError::NoSession);
        }
        self.running = false;
        self.killed += 1;
        Ok(())
    }

    fn remove_lock(&mut self) -> Result<(), LinkError> {
        self.locks_removed += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMailer {
    pub sent: Vec<PreviewMail>,
    pub refuse: bool,
}

impl MailTransport for MockMailer {
    fn send(&mut self, mail: &PreviewMail) -> Result<(), DeliveryError> {
        if self.refuse {
            return Err(DeliveryError::Relay("421 service not available".into()));
        }
        self.sent.push(mail.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockModem {
    pub history: Vec<bool>,
}

impl ModemPowerPort for MockModem {
    fn set_power(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.history.push(on);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
