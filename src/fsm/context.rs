//! Shared mutable context threaded through every capture-state handler.
//!
//! `SessionContext` lives for exactly one capture session.  It borrows the
//! hardware, notifier, clock and sink for that span and owns the
//! per-session [`CaptureSession`].  The only state that outlives a
//! session is [`ThrottleState`], borrowed from the service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::app::events::AppEvent;
use crate::app::ports::{CaptureHardware, Clock, EventSink, NotifyPort};
use crate::config::SystemConfig;
use crate::events::TriggerEvent;
use crate::motion::MotionTally;
use crate::notify::NotifyOutcome;
use crate::notify::mosaic::Mosaic;

/// File-name stamp of a session, taken once at session start.
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Text burned into stills and recordings.
pub const ANNOTATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Throttle state (process lifetime)
// ---------------------------------------------------------------------------

/// False-alarm streak bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    /// Consecutive false alarms since the last genuine capture or throttle.
    pub false_alarm_count: u32,
    /// Last time motion was classified in a finished recording.
    pub last_motion_time: Option<Duration>,
}

/// Result of adding one false alarm to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Streak length including this false alarm.
    pub streak: u32,
    /// The streak reached the threshold; the counter is back at zero.
    pub throttle: bool,
}

impl ThrottleState {
    pub fn record_false_alarm(&mut self, threshold: u32) -> Strike {
        self.false_alarm_count = self.false_alarm_count.saturating_add(1);
        let streak = self.false_alarm_count;
        let throttle = streak >= threshold;
        if throttle {
            self.false_alarm_count = 0;
        }
        Strike { streak, throttle }
    }

    /// A genuine capture breaks the streak.
    pub fn clear(&mut self) {
        self.false_alarm_count = 0;
    }
}

// ---------------------------------------------------------------------------
// Capture session (one trigger)
// ---------------------------------------------------------------------------

/// Artifacts and flags of the session in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub stamp: String,
    pub started_at: Duration,

    pub photo_path: PathBuf,
    pub photo_saved: bool,

    /// Raw encoder output in the temp directory; removed at session end.
    pub raw_video_path: PathBuf,
    pub video_path: PathBuf,
    pub video_saved: bool,

    pub recording: bool,
    pub recording_started: Option<Duration>,
    /// The one-shot continuing-motion check has run.
    pub motion_checked: bool,
    pub false_alarm: bool,
}

impl CaptureSession {
    pub fn new(config: &SystemConfig, now: NaiveDateTime, started_at: Duration) -> Self {
        let stamp = now.format(STAMP_FORMAT).to_string();
        Self {
            photo_path: config.base.data_dir.join(format!("{stamp}.jpg")),
            video_path: config.base.data_dir.join(format!("{stamp}.mp4")),
            raw_video_path: config.base.tmp_dir.join(format!("{stamp}.h264")),
            stamp,
            started_at,
            photo_saved: false,
            video_saved: false,
            recording: false,
            recording_started: None,
            motion_checked: false,
            false_alarm: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

pub struct SessionContext<'a> {
    pub hw: &'a mut dyn CaptureHardware,
    pub notifier: &'a mut dyn NotifyPort,
    pub clock: &'a dyn Clock,
    pub sink: &'a mut dyn EventSink,
    pub config: &'a SystemConfig,
    pub throttle: &'a mut ThrottleState,
    /// Written by the camera's vector reader while recording.
    pub tally: Arc<MotionTally>,

    pub trigger: TriggerEvent,
    pub session: CaptureSession,

    pub mosaic: Option<Mosaic>,
    pub notified: Option<NotifyOutcome>,
    /// The session went through the false-alarm state.
    pub false_alarm_recorded: bool,
    pub throttled: bool,
}

impl<'a> SessionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hw: &'a mut dyn CaptureHardware,
        notifier: &'a mut dyn NotifyPort,
        clock: &'a dyn Clock,
        sink: &'a mut dyn EventSink,
        config: &'a SystemConfig,
        throttle: &'a mut ThrottleState,
        tally: Arc<MotionTally>,
        trigger: TriggerEvent,
    ) -> Self {
        let session = CaptureSession::new(config, clock.now_local(), clock.uptime());
        Self {
            hw,
            notifier,
            clock,
            sink,
            config,
            throttle,
            tally,
            trigger,
            session,
            mosaic: None,
            notified: None,
            false_alarm_recorded: false,
            throttled: false,
        }
    }

    pub fn emit(&mut self, event: AppEvent) {
        self.sink.emit(&event);
    }

    /// Current local time formatted for on-image annotation.
    pub fn annotation(&self) -> String {
        self.clock.now_local().format(ANNOTATION_FORMAT).to_string()
    }
}
