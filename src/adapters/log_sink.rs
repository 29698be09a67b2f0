//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the log facade (stdout or the data-directory log file, depending on
//! how the binary set up the subscriber).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as one line.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Triggered(t) => {
                info!(
                    "TRIGGER | channel={} forced={} at={:.3}s",
                    t.channel,
                    t.forced,
                    t.timestamp.as_secs_f32()
                );
            }
            AppEvent::TriggerIgnored(t) => {
                info!("TRIGGER | channel={} ignored, level low", t.channel);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::PhotoSaved(path) => {
                info!("PHOTO | {}", path.display());
            }
            AppEvent::VideoSaved(path) => {
                info!("VIDEO | {}", path.display());
            }
            AppEvent::FalseAlarm {
                motion_frames,
                streak,
            } => {
                info!("FALSE ALARM | motion_frames={motion_frames} streak={streak}");
            }
            AppEvent::Throttled { delay_secs } => {
                warn!("THROTTLE | backing off {delay_secs}s");
            }
            AppEvent::MosaicBuilt { frames, bytes } => {
                info!("MOSAIC | frames={frames} bytes={bytes}");
            }
            AppEvent::Notified(outcome) => {
                info!("NOTIFY | {:?}", outcome);
            }
            AppEvent::SessionEnded { outcome, telemetry } => {
                info!("SESSION | {:?} | {}", outcome, telemetry);
            }
        }
    }
}
