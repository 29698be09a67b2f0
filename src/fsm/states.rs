//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers over a
//! [`SessionContext`].  One session walks the table once:
//!
//! ```text
//!  IDLE ──[forced ∨ level high]──▶ PHOTO_CAPTURE ──▶ VIDEO_CAPTURE
//!    ▲                                                   │
//!    │                 [false alarm ∧ ¬forced]           │ [otherwise]
//!    ├──────────────────── FALSE_ALARM ◀─────────────────┤
//!    │                    (maybe throttle)               ▼
//!    │                                                CONVERT ──[transcode err]──▶ abort
//!    │                                                   │
//!    ├──────[nothing to send]──────────────────────── THUMBNAIL
//!    │                                                   │
//!    └──────────────────────────────────────────────── NOTIFY
//! ```
//!
//! Illumination is switched on entering PHOTO_CAPTURE and off leaving
//! VIDEO_CAPTURE, whichever way it is left.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::context::SessionContext;
use super::{StateDescriptor, StateId};
use crate::app::events::AppEvent;
use crate::app::ports::{PhotoSettings, VideoSettings};
use crate::error::{CaptureError, SessionError};
use crate::motion::{MotionAnalyzer, MotionThresholds};
use crate::notify::{NotifyRequest, mosaic};

/// Annotation refresh period while recording.
const REFRESH: Duration = Duration::from_secs(1);

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: PhotoCapture
        StateDescriptor {
            id: StateId::PhotoCapture,
            name: "PhotoCapture",
            on_enter: Some(photo_enter),
            on_exit: None,
            on_update: photo_update,
        },
        // Index 2: VideoCapture
        StateDescriptor {
            id: StateId::VideoCapture,
            name: "VideoCapture",
            on_enter: Some(video_enter),
            on_exit: Some(video_exit),
            on_update: video_update,
        },
        // Index 3: FalseAlarm
        StateDescriptor {
            id: StateId::FalseAlarm,
            name: "FalseAlarm",
            on_enter: None,
            on_exit: None,
            on_update: false_alarm_update,
        },
        // Index 4: Convert
        StateDescriptor {
            id: StateId::Convert,
            name: "Convert",
            on_enter: None,
            on_exit: None,
            on_update: convert_update,
        },
        // Index 5: Thumbnail
        StateDescriptor {
            id: StateId::Thumbnail,
            name: "Thumbnail",
            on_enter: None,
            on_exit: None,
            on_update: thumbnail_update,
        },
        // Index 6: Notify
        StateDescriptor {
            id: StateId::Notify,
            name: "Notify",
            on_enter: None,
            on_exit: None,
            on_update: notify_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    if ctx.trigger.forced || ctx.hw.read_level() {
        return Ok(StateId::PhotoCapture);
    }
    Ok(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  PHOTO_CAPTURE: one still at full resolution
// ═══════════════════════════════════════════════════════════════════════════

fn photo_enter(ctx: &mut SessionContext<'_>) {
    if let Err(e) = ctx.hw.set_illumination(true) {
        warn!("PHOTO: IR LED on failed: {e}");
    }
}

fn photo_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    let config = ctx.config;
    let warmup = config.gpio.ir_warmup_secs;
    if warmup > 0 {
        ctx.clock.sleep(Duration::from_secs(u64::from(warmup)))?;
    }

    let settings = PhotoSettings {
        resolution: config.camera.photo_res,
        rotation: config.camera.rotation,
        annotation: ctx.annotation(),
    };
    let path = ctx.session.photo_path.clone();
    match ctx.hw.capture_photo(&path, &settings) {
        Ok(()) => {
            info!("PHOTO: saved {}", path.display());
            ctx.session.photo_saved = true;
            ctx.emit(AppEvent::PhotoSaved(path));
        }
        // Not fatal: the session goes on without a still.
        Err(e) => warn!("PHOTO: {e}"),
    }
    Ok(StateId::VideoCapture)
}

// ═══════════════════════════════════════════════════════════════════════════
//  VIDEO_CAPTURE: recording gated by the continuing-motion check
// ═══════════════════════════════════════════════════════════════════════════

fn video_enter(ctx: &mut SessionContext<'_>) {
    let config = ctx.config;
    let started = ctx.clock.uptime();
    ctx.tally.reset(started);

    let analyzer = MotionAnalyzer::new(
        MotionThresholds::from(&config.motion),
        Arc::clone(&ctx.tally),
    );
    let settings = VideoSettings {
        resolution: config.camera.video_res,
        framerate: config.camera.framerate,
        rotation: config.camera.rotation,
        annotation: ctx.annotation(),
    };
    let raw = ctx.session.raw_video_path.clone();
    match ctx.hw.start_recording(&raw, &settings, analyzer) {
        Ok(()) => {
            info!(
                "VIDEO: recording {} @ {}fps, up to {}s",
                settings.resolution, settings.framerate, config.camera.video_max_length
            );
            ctx.session.recording = true;
            ctx.session.recording_started = Some(started);
        }
        Err(e) => error!("VIDEO: {e}, skipping video"),
    }
}

fn video_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    let Some(started) = ctx.session.recording_started else {
        // Recording never started: nothing to convert or send.
        return Ok(StateId::Idle);
    };
    let config = ctx.config;
    let max = Duration::from_secs(u64::from(config.camera.video_max_length));
    let elapsed = ctx.clock.uptime().saturating_sub(started);

    if elapsed >= max {
        debug!("VIDEO: reached {}s", max.as_secs());
        return Ok(decide(ctx));
    }

    let threshold = Duration::from_secs(u64::from(config.motion.threshold_time));
    if !ctx.session.motion_checked && elapsed >= threshold {
        ctx.session.motion_checked = true;
        let count = ctx.tally.motion_count();
        if count < config.motion.threshold_count {
            info!(
                "VIDEO: {count} motion frames by {}s (need {}), stopping early",
                elapsed.as_secs(),
                config.motion.threshold_count
            );
            ctx.session.false_alarm = true;
            return Ok(decide(ctx));
        }
        debug!("VIDEO: {count} motion frames by {}s, continuing", elapsed.as_secs());
    }

    let text = ctx.annotation();
    ctx.hw.annotate(&text);
    ctx.clock.sleep(REFRESH.min(max - elapsed))?;
    Ok(StateId::VideoCapture)
}

fn video_exit(ctx: &mut SessionContext<'_>) {
    stop_recording(ctx);
    if let Err(e) = ctx.hw.set_illumination(false) {
        warn!("VIDEO: IR LED off failed: {e}");
    }
}

/// Stop the recording and pick the branch out of VIDEO_CAPTURE.
fn decide(ctx: &mut SessionContext<'_>) -> StateId {
    stop_recording(ctx);
    if !ctx.session.false_alarm {
        return StateId::Convert;
    }
    if ctx.trigger.forced {
        info!("VIDEO: forced session, keeping the recording");
        return StateId::Convert;
    }
    StateId::FalseAlarm
}

fn stop_recording(ctx: &mut SessionContext<'_>) {
    if !ctx.session.recording {
        return;
    }
    ctx.session.recording = false;
    match ctx.hw.stop_recording() {
        Ok(()) | Err(CaptureError::NotRecording) => {}
        Err(e) => warn!("VIDEO: stop failed: {e}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FALSE_ALARM: streak bookkeeping and throttle
// ═══════════════════════════════════════════════════════════════════════════

fn false_alarm_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    let throttle = ctx.config.throttle;
    let strike = ctx.throttle.record_false_alarm(throttle.threshold);
    ctx.false_alarm_recorded = true;
    ctx.emit(AppEvent::FalseAlarm {
        motion_frames: ctx.tally.motion_count(),
        streak: strike.streak,
    });

    if strike.throttle {
        warn!(
            "THROTTLE: {} false alarms in a row, sleeping {}s",
            strike.streak, throttle.delay_secs
        );
        ctx.throttled = true;
        ctx.emit(AppEvent::Throttled {
            delay_secs: throttle.delay_secs,
        });
        ctx.clock.sleep(Duration::from_secs(u64::from(throttle.delay_secs)))?;
    }
    Ok(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONVERT: raw recording into the delivery container
// ═══════════════════════════════════════════════════════════════════════════

fn convert_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    ctx.throttle.clear();

    let raw = ctx.session.raw_video_path.clone();
    let out = ctx.session.video_path.clone();
    ctx.hw.transcode(&raw, &out, ctx.config.camera.framerate)?;

    info!("CONVERT: saved {}", out.display());
    ctx.session.video_saved = true;
    ctx.emit(AppEvent::VideoSaved(out));
    Ok(StateId::Thumbnail)
}

// ═══════════════════════════════════════════════════════════════════════════
//  THUMBNAIL: mosaic of the finished recording
// ═══════════════════════════════════════════════════════════════════════════

fn thumbnail_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    let camera = &ctx.config.camera;
    match mosaic::build(
        &mut *ctx.hw,
        &ctx.session.video_path,
        camera.video_thumbnails_num,
        camera.preview_res,
        camera.thumbnail_quality,
    ) {
        Ok(m) => {
            ctx.emit(AppEvent::MosaicBuilt {
                frames: m.frames.len(),
                bytes: m.jpeg.len(),
            });
            ctx.mosaic = Some(m);
        }
        Err(e) => warn!("THUMBNAIL: {e}"),
    }

    let photo_only = ctx.session.photo_saved && ctx.config.smtp.attach_photo;
    if ctx.mosaic.is_some() || photo_only {
        Ok(StateId::Notify)
    } else {
        info!("THUMBNAIL: nothing to send");
        Ok(StateId::Idle)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  NOTIFY: hand the preview to the notifier
// ═══════════════════════════════════════════════════════════════════════════

fn notify_update(ctx: &mut SessionContext<'_>) -> Result<StateId, SessionError> {
    let request = NotifyRequest {
        stamp: ctx.session.stamp.clone(),
        mosaic: ctx.mosaic.take(),
        photo: ctx
            .session
            .photo_saved
            .then(|| ctx.session.photo_path.clone()),
        telemetry: ctx.hw.sample(),
    };
    let outcome = ctx.notifier.deliver(&request);
    ctx.notified = Some(outcome);
    ctx.emit(AppEvent::Notified(outcome));
    Ok(StateId::Idle)
}
