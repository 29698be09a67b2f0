//! Unified error types for the camera trap.
//!
//! One enum per failure class, each with a fixed recovery policy:
//!
//! | Class            | Recovery                                        |
//! |------------------|-------------------------------------------------|
//! | `CaptureError`   | degrade the session (skip photo or video)       |
//! | `ConversionError`| abort the notification phase of the session     |
//! | `LinkError`      | abort notification, full teardown still runs    |
//! | `DeliveryError`  | logged, reported as a failed delivery           |
//! | `Interrupted`    | termination requested, unwind to teardown       |
//!
//! A false alarm is a policy outcome, never an error.  None of these is
//! fatal to the process.
//!
//! [`Error`] is what a multi-sample sensor read can fail with: a bad
//! sample, or shutdown arriving between samples.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Sampling error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum Error {
    #[error("sensor: {0}")]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

// ---------------------------------------------------------------------------
// Capture errors (camera unavailable, encoder failure)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("camera tool exited with {0}")]
    ToolFailed(String),
    #[error("no recording in progress")]
    NotRecording,
    #[error("camera I/O: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Conversion errors (external transcoder)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("transcoder could not be started: {0}")]
    Spawn(#[source] io::Error),
    #[error("transcoder exited with status {0}")]
    ExitStatus(String),
}

// ---------------------------------------------------------------------------
// Link errors (dial-up session)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("empty call command")]
    EmptyCommand,
    #[error("dial-up session could not be started: {0}")]
    Spawn(#[source] io::Error),
    #[error("no dial-up session running")]
    NoSession,
    #[error("no traffic on {interface} after {secs}s")]
    Timeout { interface: String, secs: u32 },
    #[error("lock file {}: {source}", path.display())]
    LockFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("kill failed: {0}")]
    Kill(#[source] io::Error),
}

// ---------------------------------------------------------------------------
// Delivery errors (mail relay)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {0:?}")]
    Address(String),
    #[error("message could not be built: {0}")]
    Build(String),
    #[error("relay unreachable or refused: {0}")]
    Relay(String),
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("ADC read failed")]
    AdcReadFailed,
    #[error("ADC channel {0} does not exist")]
    InvalidChannel(u8),
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("GPIO write failed")]
    GpioWriteFailed,
}

// ---------------------------------------------------------------------------
// Mosaic errors (thumbnail grid)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MosaicError {
    #[error("recording has {total} frames, {requested} thumbnails requested")]
    NotEnoughFrames { total: u64, requested: u32 },
    #[error("frame {index} unavailable: {reason}")]
    Frame { index: u64, reason: String },
    #[error("frame probe failed: {0}")]
    Probe(String),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
}

// ---------------------------------------------------------------------------
// Configuration errors (the only fatal class)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// A blocking wait was cut short because shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted by shutdown")]
pub struct Interrupted;

// ---------------------------------------------------------------------------
// Session errors (what a state handler may abort with)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
