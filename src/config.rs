//! System configuration parameters
//!
//! All tunable parameters for the camera trap, read once at startup from a
//! TOML file.  Every section and field carries a default, so a partial
//! file (or an empty one) yields a working configuration.
//!
//! ```toml
//! [base]
//! data_dir = "/home/pi/picam"
//!
//! [motion]
//! threshold_time = 10
//! threshold_count = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/picam/config.toml";

/// Pixel dimensions of a capture or preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl core::fmt::Display for Resolution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ───────────────────────────────────────────────────────────────
// Top-level configuration
// ───────────────────────────────────────────────────────────────

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub base: BaseConfig,
    pub gpio: GpioConfig,
    pub camera: CameraConfig,
    pub motion: MotionConfig,
    pub throttle: ThrottleConfig,
    pub modem: ModemConfig,
    pub smtp: SmtpConfig,
    pub telemetry: TelemetryConfig,
}

// --- Base ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Where photos, videos and the log file are written.
    pub data_dir: PathBuf,
    /// Scratch space for raw recordings.
    pub tmp_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Pause after every capture session before the next trigger is accepted.
    pub cooldown_secs: u32,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/home/pi/picam"),
            tmp_dir: PathBuf::from("/tmp"),
            ffmpeg_path: PathBuf::from("/usr/bin/ffmpeg"),
            ffprobe_path: PathBuf::from("/usr/bin/ffprobe"),
            cooldown_secs: 0,
        }
    }
}

// --- GPIO ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// GPIO character device.
    pub chip: PathBuf,
    pub ir_led_pin: u32,
    pub motion_sensor_pin: u32,
    pub modem_power_pin: u32,
    /// Rising edges closer together than this are treated as bounce.
    pub debounce_ms: u32,
    /// Illumination settle time before the still capture.
    pub ir_warmup_secs: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: PathBuf::from(pins::GPIO_CHIP),
            ir_led_pin: pins::IR_LED_LINE,
            motion_sensor_pin: pins::MOTION_SENSOR_LINE,
            modem_power_pin: pins::MODEM_POWER_LINE,
            debounce_ms: 200,
            ir_warmup_secs: 2,
        }
    }
}

// --- Camera ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub still_command: PathBuf,
    pub video_command: PathBuf,
    /// Image rotation in degrees (0, 90, 180 or 270).
    pub rotation: u16,
    pub photo_res: Resolution,
    pub video_res: Resolution,
    /// Size of each mosaic cell and of attached previews.
    pub preview_res: Resolution,
    pub framerate: u32,
    /// Hard cap on a recording, in seconds.
    pub video_max_length: u32,
    pub video_thumbnails_num: u32,
    /// JPEG quality of the mosaic (1-100).
    pub thumbnail_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            still_command: PathBuf::from("/usr/bin/raspistill"),
            video_command: PathBuf::from("/usr/bin/raspivid"),
            rotation: 0,
            photo_res: Resolution::new(2592, 1944),
            video_res: Resolution::new(640, 480),
            preview_res: Resolution::new(320, 240),
            framerate: 25,
            video_max_length: 30,
            video_thumbnails_num: 9,
            thumbnail_quality: 75,
        }
    }
}

// --- Motion ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// A block whose vector magnitude exceeds this counts as moving.
    pub magnitude_min: u16,
    /// A frame with more moving blocks than this is a motion frame.
    pub vectors_min: u32,
    /// Seconds into the recording at which continuing motion is checked.
    pub threshold_time: u32,
    /// Motion frames required by `threshold_time`.
    pub threshold_count: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            magnitude_min: 60,
            vectors_min: 10,
            threshold_time: 10,
            threshold_count: 5,
        }
    }
}

// --- Throttle ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Consecutive false alarms before the trap backs off.
    pub threshold: u32,
    pub delay_secs: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            delay_secs: 600,
        }
    }
}

// --- Modem ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Dial-up command line, split on whitespace.
    pub ppp_call_command: String,
    /// Seconds to wait for traffic on the link interface.
    pub ppp_timeout: u32,
    pub interface: String,
    pub lock_file: PathBuf,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            ppp_call_command: "pon".into(),
            ppp_timeout: 60,
            interface: "ppp0".into(),
            lock_file: PathBuf::from("/var/lock/LCK..ttyAMA0"),
        }
    }
}

// --- SMTP ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub timeout_secs: u32,
    /// Attempt opportunistic STARTTLS.
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: String,
    /// Attach the still photo after the mosaic.
    pub attach_photo: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: "localhost".into(),
            port: 587,
            timeout_secs: 30,
            starttls: true,
            username: None,
            password: None,
            from: "picam@localhost".into(),
            to: "root@localhost".into(),
            attach_photo: false,
        }
    }
}

// --- Telemetry ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub spi_device: PathBuf,
    /// MCP3008 channel wired to the battery divider.
    pub adc_channel: u8,
    /// ADC reference voltage.
    pub adc_vref: f32,
    /// Ratio of the resistive divider in front of the ADC input.
    pub divider_ratio: f32,
    /// Battery voltage reported as 0 %.
    pub voltage_min: f32,
    /// Battery voltage reported as 100 %.
    pub voltage_max: f32,
    pub low_battery_percent: u8,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            spi_device: PathBuf::from(pins::ADC_SPI_DEVICE),
            adc_channel: pins::BATTERY_ADC_CHANNEL,
            adc_vref: 3.3,
            divider_ratio: 4.0,
            voltage_min: 11.0,
            voltage_max: 12.8,
            low_battery_percent: 20,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Loading & validation
// ───────────────────────────────────────────────────────────────

impl SystemConfig {
    /// Read, parse and validate the file at `path`.
    ///
    /// Any failure here is fatal to the process.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(path, &content)?;
        let problems = config.validate();
        if problems.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Every violated constraint, in human-readable form.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let cam = &self.camera;

        if !matches!(cam.rotation, 0 | 90 | 180 | 270) {
            problems.push(format!("camera.rotation must be 0/90/180/270, got {}", cam.rotation));
        }
        for (name, res) in [
            ("photo_res", cam.photo_res),
            ("video_res", cam.video_res),
            ("preview_res", cam.preview_res),
        ] {
            if res.width == 0 || res.height == 0 {
                problems.push(format!("camera.{name} must be non-zero, got {res}"));
            }
        }
        if cam.framerate == 0 {
            problems.push("camera.framerate must be > 0".into());
        }
        if cam.video_max_length == 0 {
            problems.push("camera.video_max_length must be > 0".into());
        }
        if cam.video_thumbnails_num == 0 {
            problems.push("camera.video_thumbnails_num must be > 0".into());
        }
        if !(1..=100).contains(&cam.thumbnail_quality) {
            problems.push(format!(
                "camera.thumbnail_quality must be 1-100, got {}",
                cam.thumbnail_quality
            ));
        }

        if self.motion.threshold_time > cam.video_max_length {
            problems.push(format!(
                "motion.threshold_time ({}) exceeds camera.video_max_length ({})",
                self.motion.threshold_time, cam.video_max_length
            ));
        }
        if self.throttle.threshold == 0 {
            problems.push("throttle.threshold must be > 0".into());
        }

        if self.modem.ppp_call_command.split_whitespace().next().is_none() {
            problems.push("modem.ppp_call_command is empty".into());
        }
        if self.modem.ppp_timeout == 0 {
            problems.push("modem.ppp_timeout must be > 0".into());
        }
        if self.modem.interface.is_empty() {
            problems.push("modem.interface is empty".into());
        }

        if self.smtp.server.is_empty() {
            problems.push("smtp.server is empty".into());
        }
        if self.smtp.username.is_some() != self.smtp.password.is_some() {
            problems.push("smtp.username and smtp.password must be set together".into());
        }

        let t = &self.telemetry;
        if t.adc_channel > 7 {
            problems.push(format!("telemetry.adc_channel must be 0-7, got {}", t.adc_channel));
        }
        if t.voltage_max <= t.voltage_min {
            problems.push(format!(
                "telemetry.voltage_max ({}) must exceed voltage_min ({})",
                t.voltage_max, t.voltage_min
            ));
        }
        if t.adc_vref <= 0.0 || t.divider_ratio <= 0.0 {
            problems.push("telemetry.adc_vref and divider_ratio must be > 0".into());
        }
        if t.low_battery_percent > 100 {
            problems.push("telemetry.low_battery_percent must be <= 100".into());
        }

        problems
    }
}
