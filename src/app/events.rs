//! Outbound application events.
//!
//! The [`CaptureService`](super::service::CaptureService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them; in production they are
//! rendered as log lines.

use std::path::PathBuf;

use crate::events::TriggerEvent;
use crate::fsm::StateId;
use crate::notify::NotifyOutcome;
use crate::sensors::TelemetryReading;

use super::service::SessionOutcome;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A trigger was taken up by the capture controller.
    Triggered(TriggerEvent),

    /// The trigger was unforced and the sensor had already dropped.
    TriggerIgnored(TriggerEvent),

    /// The capture state machine moved between states.
    StateChanged { from: StateId, to: StateId },

    PhotoSaved(PathBuf),

    VideoSaved(PathBuf),

    /// The continuing-motion check failed.
    FalseAlarm { motion_frames: u32, streak: u32 },

    /// Too many false alarms in a row; the trap backs off.
    Throttled { delay_secs: u32 },

    MosaicBuilt { frames: usize, bytes: usize },

    Notified(NotifyOutcome),

    /// A session finished, with the telemetry sampled at its end.
    SessionEnded {
        outcome: SessionOutcome,
        telemetry: TelemetryReading,
    },
}
