//! Hardware adapter: bridges real peripherals to the domain port traits.
//!
//! Owns the camera tools, the IR LED driver, the shared motion-sensor
//! level and the telemetry sampler, exposing them all as one
//! [`CaptureHardware`](crate::app::ports::CaptureHardware).  This is the
//! only type the capture service touches hardware through.

use std::path::Path;

use embedded_hal::digital::OutputPin;
use image::RgbImage;

use crate::adapters::camera::RaspiCamera;
use crate::adapters::ffmpeg::Ffmpeg;
use crate::app::ports::{
    CameraPort, FrameSourcePort, IlluminationPort, MotionSensorPort, PhotoSettings,
    TelemetryPort, TranscoderPort, VideoSettings,
};
use crate::drivers::ir_led::IrLed;
use crate::drivers::motion_sensor::SensorLevel;
use crate::error::{ActuatorError, CaptureError, ConversionError, MosaicError};
use crate::motion::MotionAnalyzer;
use crate::sensors::TelemetryReading;

/// Concrete adapter that combines all capture hardware behind port traits.
pub struct HardwareAdapter<P, T> {
    camera: RaspiCamera,
    ir: IrLed<P>,
    level: SensorLevel,
    ffmpeg: Ffmpeg,
    telemetry: T,
}

impl<P: OutputPin, T: TelemetryPort> HardwareAdapter<P, T> {
    pub fn new(
        camera: RaspiCamera,
        ir: IrLed<P>,
        level: SensorLevel,
        ffmpeg: Ffmpeg,
        telemetry: T,
    ) -> Self {
        Self {
            camera,
            ir,
            level,
            ffmpeg,
            telemetry,
        }
    }

    pub fn ir(&self) -> &IrLed<P> {
        &self.ir
    }
}

// ── Sensor ────────────────────────────────────────────────────

impl<P, T> MotionSensorPort for HardwareAdapter<P, T> {
    fn read_level(&mut self) -> bool {
        self.level.get()
    }
}

// ── Illumination ──────────────────────────────────────────────

impl<P: OutputPin, T> IlluminationPort for HardwareAdapter<P, T> {
    fn set_illumination(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.ir.set_illumination(on)
    }
}

// ── Camera ────────────────────────────────────────────────────

impl<P, T> CameraPort for HardwareAdapter<P, T> {
    fn capture_photo(&mut self, path: &Path, settings: &PhotoSettings) -> Result<(), CaptureError> {
        self.camera.capture_photo(path, settings)
    }

    fn start_recording(
        &mut self,
        raw_path: &Path,
        settings: &VideoSettings,
        analyzer: MotionAnalyzer,
    ) -> Result<(), CaptureError> {
        self.camera.start_recording(raw_path, settings, analyzer)
    }

    fn annotate(&mut self, text: &str) {
        self.camera.annotate(text);
    }

    fn stop_recording(&mut self) -> Result<(), CaptureError> {
        self.camera.stop_recording()
    }

    fn close(&mut self) {
        self.camera.close();
    }
}

// ── Video tooling ─────────────────────────────────────────────

impl<P, T> TranscoderPort for HardwareAdapter<P, T> {
    fn transcode(&mut self, raw: &Path, out: &Path, framerate: u32) -> Result<(), ConversionError> {
        self.ffmpeg.transcode(raw, out, framerate)
    }
}

impl<P, T> FrameSourcePort for HardwareAdapter<P, T> {
    fn frame_count(&mut self, video: &Path) -> Result<u64, MosaicError> {
        self.ffmpeg.frame_count(video)
    }

    fn frame_at(&mut self, video: &Path, index: u64) -> Result<RgbImage, MosaicError> {
        self.ffmpeg.frame_at(video, index)
    }
}

// ── Telemetry ─────────────────────────────────────────────────

impl<P, T: TelemetryPort> TelemetryPort for HardwareAdapter<P, T> {
    fn sample(&mut self) -> TelemetryReading {
        self.telemetry.sample()
    }
}
