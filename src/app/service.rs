//! Application service: the hexagonal core.
//!
//! [`CaptureService`] owns the capture state machine and the throttle
//! counters that outlive a single session.  All I/O flows through port
//! traits injected at call sites, so the whole session logic runs against
//! mock adapters in tests.
//!
//! ```text
//!  TriggerConsumer ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!                      │     CaptureService       │
//!  CaptureHardware ◀──▶│  FSM · ThrottleState     │──▶ NotifyPort
//!                      └─────────────────────────┘
//! ```
//!
//! One call to [`CaptureService::handle_trigger`] is one session.  The
//! session teardown (`finish`) runs on every path out of the state
//! machine: success, false alarm, abort and cancellation.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::SystemConfig;
use crate::error::{CaptureError, SessionError};
use crate::events::TriggerEvent;
use crate::fsm::context::{SessionContext, ThrottleState};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::motion::MotionTally;
use crate::notify::NotifyOutcome;

use super::events::AppEvent;
use super::ports::{CaptureHardware, Clock, EventSink, NotifyPort};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Unforced trigger with the sensor already low; nothing happened.
    Ignored,
    FalseAlarm {
        throttled: bool,
    },
    /// The recording was kept; `notified` is true when the mail went out.
    Completed {
        notified: bool,
    },
    /// A handler failed (transcoder exit status, camera fault).
    Aborted(String),
    /// Shutdown was requested mid-session.
    Cancelled,
}

// ───────────────────────────────────────────────────────────────
// CaptureService
// ───────────────────────────────────────────────────────────────

pub struct CaptureService {
    fsm: Fsm,
    config: SystemConfig,
    throttle: ThrottleState,
    /// Shared with the camera's vector reader for the current recording.
    tally: Arc<MotionTally>,
    clock: Arc<dyn Clock>,
    sessions: u64,
}

impl CaptureService {
    pub fn new(config: SystemConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            config,
            throttle: ThrottleState::default(),
            tally: Arc::new(MotionTally::new()),
            clock,
            sessions: 0,
        }
    }

    /// Run one capture session for `event` to completion.
    ///
    /// Blocks for the whole session, including a throttle delay and the
    /// post-session cooldown.  Never fails; the outcome says what happened.
    pub fn handle_trigger(
        &mut self,
        event: TriggerEvent,
        hw: &mut impl CaptureHardware,
        notifier: &mut impl NotifyPort,
        sink: &mut impl EventSink,
    ) -> SessionOutcome {
        let mut ctx = SessionContext::new(
            hw,
            notifier,
            &*self.clock,
            sink,
            &self.config,
            &mut self.throttle,
            Arc::clone(&self.tally),
            event,
        );

        // The first tick decides whether this trigger starts a session.
        let first = self.fsm.tick(&mut ctx);
        if first.is_ok() && self.fsm.current_state() == StateId::Idle {
            debug!("Trigger on channel {} ignored: sensor level low", event.channel);
            ctx.emit(AppEvent::TriggerIgnored(event));
            return SessionOutcome::Ignored;
        }

        self.sessions += 1;
        info!(
            "SESSION {}: {} trigger, stamp {}",
            self.sessions,
            if event.forced { "forced" } else { "sensor" },
            ctx.session.stamp
        );
        ctx.emit(AppEvent::Triggered(event));

        let result = first.and_then(|()| drive(&mut self.fsm, &mut ctx));
        if result.is_err() {
            self.fsm.force_transition(StateId::Idle, &mut ctx);
        }

        let outcome = match result {
            Err(SessionError::Interrupted(_)) => {
                warn!("SESSION: interrupted by shutdown");
                SessionOutcome::Cancelled
            }
            Err(e) => {
                error!("SESSION: aborted: {e}");
                SessionOutcome::Aborted(e.to_string())
            }
            Ok(()) if ctx.false_alarm_recorded => SessionOutcome::FalseAlarm {
                throttled: ctx.throttled,
            },
            Ok(()) => SessionOutcome::Completed {
                notified: ctx.notified == Some(NotifyOutcome::Sent),
            },
        };
        finish(&mut ctx, &outcome);
        drop(ctx);

        self.cooldown(&outcome);
        outcome
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn throttle(&self) -> ThrottleState {
        self.throttle
    }

    pub fn tally(&self) -> &MotionTally {
        &self.tally
    }

    /// Sessions started (ignored triggers not counted).
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn cooldown(&self, outcome: &SessionOutcome) {
        let secs = self.config.base.cooldown_secs;
        if secs == 0 || matches!(outcome, SessionOutcome::Ignored | SessionOutcome::Cancelled) {
            return;
        }
        debug!("Cooldown {secs}s");
        if self.clock.sleep(Duration::from_secs(u64::from(secs))).is_err() {
            debug!("Cooldown cut short by shutdown");
        }
    }
}

/// Tick until the machine is back in `Idle`.
fn drive(fsm: &mut Fsm, ctx: &mut SessionContext<'_>) -> Result<(), SessionError> {
    while fsm.current_state() != StateId::Idle {
        fsm.tick(ctx)?;
    }
    Ok(())
}

/// Session teardown.  Every step tolerates the resource already released.
fn finish(ctx: &mut SessionContext<'_>, outcome: &SessionOutcome) {
    if ctx.session.recording {
        ctx.session.recording = false;
        match ctx.hw.stop_recording() {
            Ok(()) | Err(CaptureError::NotRecording) => {}
            Err(e) => warn!("SESSION: stop recording: {e}"),
        }
    }
    if let Err(e) = ctx.hw.set_illumination(false) {
        warn!("SESSION: IR LED off failed: {e}");
    }

    let raw = &ctx.session.raw_video_path;
    match std::fs::remove_file(raw) {
        Ok(()) => debug!("SESSION: removed {}", raw.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("SESSION: remove {}: {e}", raw.display()),
    }

    if ctx.session.recording_started.is_some() {
        ctx.throttle.last_motion_time = Some(ctx.tally.last_motion());
    }

    if *outcome == SessionOutcome::Cancelled {
        return;
    }
    let telemetry = ctx.hw.sample();
    ctx.emit(AppEvent::SessionEnded {
        outcome: outcome.clone(),
        telemetry,
    });
}
