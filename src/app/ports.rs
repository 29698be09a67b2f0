//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CaptureService / Notifier (domain)
//! ```
//!
//! Driven adapters (camera, GPIO lines, transcoder, modem, mail relay,
//! ADC, clock) implement these traits.  The domain consumes them via
//! generics or trait objects, so the capture controller never touches a
//! device binding directly and every port can be replaced by a recording
//! mock in tests.
//!
//! All port errors are typed (see [`crate::error`]); the caller decides
//! the recovery per failure class.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use image::RgbImage;

use crate::config::Resolution;
use crate::error::{
    ActuatorError, CaptureError, ConversionError, DeliveryError, Interrupted, LinkError,
    MosaicError, SensorError,
};
use crate::motion::MotionAnalyzer;
use crate::notify::mail::PreviewMail;
use crate::notify::{NotifyOutcome, NotifyRequest};
use crate::sensors::TelemetryReading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Current level of the motion-detect line.
pub trait MotionSensorPort {
    /// `true` while the sensor output is asserted.
    fn read_level(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// IR illuminator.
pub trait IlluminationPort {
    fn set_illumination(&mut self, on: bool) -> Result<(), ActuatorError>;
}

/// Modem power control.  Implementations own the line polarity.
pub trait ModemPowerPort {
    fn set_power(&mut self, on: bool) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Camera port
// ───────────────────────────────────────────────────────────────

/// Parameters of a still capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSettings {
    pub resolution: Resolution,
    pub rotation: u16,
    /// Text burned into the image.
    pub annotation: String,
}

/// Parameters of a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub resolution: Resolution,
    pub framerate: u32,
    pub rotation: u16,
    pub annotation: String,
}

/// The camera: one still capture at a time, or one recording.
pub trait CameraPort {
    fn capture_photo(&mut self, path: &Path, settings: &PhotoSettings) -> Result<(), CaptureError>;

    /// Start recording raw H.264 to `raw_path`.  Every encoded frame's
    /// motion vectors are fed to `analyzer` until the recording stops.
    fn start_recording(
        &mut self,
        raw_path: &Path,
        settings: &VideoSettings,
        analyzer: MotionAnalyzer,
    ) -> Result<(), CaptureError>;

    /// Replace the on-image annotation of the running recording.
    fn annotate(&mut self, text: &str);

    fn stop_recording(&mut self) -> Result<(), CaptureError>;

    /// Release the camera.  Safe to call when nothing is open.
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Video tooling ports
// ───────────────────────────────────────────────────────────────

/// Remuxes a raw recording into the delivery container.
pub trait TranscoderPort {
    fn transcode(&mut self, raw: &Path, out: &Path, framerate: u32) -> Result<(), ConversionError>;
}

/// Random access to decoded frames of a finished recording.
pub trait FrameSourcePort {
    fn frame_count(&mut self, video: &Path) -> Result<u64, MosaicError>;
    fn frame_at(&mut self, video: &Path, index: u64) -> Result<RgbImage, MosaicError>;
}

// ───────────────────────────────────────────────────────────────
// Telemetry ports
// ───────────────────────────────────────────────────────────────

/// One formatted status sample (battery, CPU, disk).
pub trait TelemetryPort {
    fn sample(&mut self) -> TelemetryReading;
}

/// Raw analog-to-digital converter.
pub trait AdcPort {
    fn read_raw(&mut self, channel: u8) -> Result<u16, SensorError>;
    /// Code corresponding to the reference voltage.
    fn full_scale(&self) -> u16;
}

/// Single-shot host statistics.
pub trait SystemStatsPort {
    fn cpu_temp_c(&mut self) -> Option<f32>;
    /// Percentage used of the filesystem holding `path`.
    fn disk_usage_percent(&mut self, path: &Path) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Capture hardware bundle
// ───────────────────────────────────────────────────────────────

/// Everything a capture session touches.
///
/// Blanket-implemented, so any type providing the individual ports is a
/// `CaptureHardware` and a single `&mut` reaches all of them.
pub trait CaptureHardware:
    MotionSensorPort + IlluminationPort + CameraPort + TranscoderPort + FrameSourcePort + TelemetryPort
{
    /// Illumination off, recording stopped, camera released.
    ///
    /// Every step tolerates the resource already being released.
    fn release(&mut self) {
        if let Err(e) = self.set_illumination(false) {
            log::warn!("IR LED off failed during release: {e}");
        }
        match self.stop_recording() {
            Ok(()) | Err(CaptureError::NotRecording) => {}
            Err(e) => log::warn!("Stopping recording during release failed: {e}"),
        }
        self.close();
    }
}

impl<T> CaptureHardware for T where
    T: MotionSensorPort
        + IlluminationPort
        + CameraPort
        + TranscoderPort
        + FrameSourcePort
        + TelemetryPort
{
}

// ───────────────────────────────────────────────────────────────
// Link & delivery ports
// ───────────────────────────────────────────────────────────────

/// Dial-up session process and its transport interface.
pub trait LinkPort {
    fn spawn_session(&mut self) -> Result<(), LinkError>;
    /// Received-byte counter of the transport interface, `None` while the
    /// interface does not exist.
    fn rx_bytes(&mut self) -> Option<u64>;
    fn kill_session(&mut self) -> Result<(), LinkError>;
    fn remove_lock(&mut self) -> Result<(), LinkError>;
}

/// Mail relay.
pub trait MailTransport {
    fn send(&mut self, mail: &PreviewMail) -> Result<(), DeliveryError>;
}

/// Store-and-forward notification: power, link, send, tear down.
pub trait NotifyPort {
    /// Never fails past this boundary; the outcome says what happened.
    fn deliver(&mut self, request: &NotifyRequest) -> NotifyOutcome;
    /// Link down and modem off.  Idempotent.
    fn shutdown(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Time source and the only way the domain blocks.
pub trait Clock: Send + Sync {
    /// Monotonic time since the clock was created.
    fn uptime(&self) -> Duration;
    /// Local wall-clock time, for file names and annotations.
    fn now_local(&self) -> NaiveDateTime;
    /// Block for `duration`, or until shutdown is requested.
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn uptime(&self) -> Duration {
        (**self).uptime()
    }

    fn now_local(&self) -> NaiveDateTime {
        (**self).now_local()
    }

    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        (**self).sleep(duration)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
