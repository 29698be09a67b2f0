//! Integration tests for the CaptureService → FSM → hardware pipeline.
//!
//! One `handle_trigger` call is one session; these drive whole sessions
//! against recording mocks and a clock that only moves when slept on.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use picam::app::events::AppEvent;
use picam::app::service::{CaptureService, SessionOutcome};
use picam::config::SystemConfig;
use picam::events::TriggerEvent;
use picam::fsm::StateId;
use picam::notify::NotifyOutcome;

use crate::mock_hw::{FakeClock, HwCall, MockHardware, MockNotifier, RecordingSink, test_config};

const LINE: u32 = 17;

struct Rig {
    _dir: TempDir,
    config: SystemConfig,
    clock: Arc<FakeClock>,
    service: CaptureService,
    hw: MockHardware,
    notifier: MockNotifier,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with(|_| {})
    }

    fn with(tweak: impl FnOnce(&mut SystemConfig)) -> Self {
        Self::with_clock(FakeClock::new(), tweak)
    }

    fn with_clock(clock: FakeClock, tweak: impl FnOnce(&mut SystemConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.camera.video_max_length = 12;
        config.motion.threshold_time = 10;
        config.motion.threshold_count = 5;
        tweak(&mut config);
        let clock = Arc::new(clock);
        Self {
            service: CaptureService::new(config.clone(), clock.clone()),
            _dir: dir,
            config,
            clock,
            hw: MockHardware::new(),
            notifier: MockNotifier::new(),
            sink: RecordingSink::new(),
        }
    }

    fn run(&mut self, event: TriggerEvent) -> SessionOutcome {
        self.service
            .handle_trigger(event, &mut self.hw, &mut self.notifier, &mut self.sink)
    }

    fn edge(&mut self) -> SessionOutcome {
        self.run(TriggerEvent::edge(LINE, Duration::ZERO))
    }

    fn forced(&mut self) -> SessionOutcome {
        self.run(TriggerEvent::forced(LINE, Duration::ZERO))
    }

    fn visited(&self) -> Vec<StateId> {
        self.sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn raw_path(&self) -> std::path::PathBuf {
        self.config.base.tmp_dir.join("20240601120000.h264")
    }
}

// ── Trigger gate ──────────────────────────────────────────────

#[test]
fn unforced_trigger_with_sensor_low_is_ignored() {
    let mut rig = Rig::new();
    rig.hw.level = false;

    assert_eq!(rig.edge(), SessionOutcome::Ignored);

    assert!(rig.hw.calls.is_empty(), "no hardware touched: {:?}", rig.hw.calls);
    assert_eq!(rig.service.sessions(), 0);
    assert_eq!(rig.service.state(), StateId::Idle);
    assert!(matches!(rig.sink.events.as_slice(), [AppEvent::TriggerIgnored(_)]));
    assert!(rig.clock.sleeps().is_empty());
}

// ── Genuine motion ────────────────────────────────────────────

#[test]
fn continuing_motion_is_recorded_converted_and_notified() {
    let mut rig = Rig::new();
    rig.hw.motion_frames = 6;

    let outcome = rig.edge();

    assert_eq!(outcome, SessionOutcome::Completed { notified: true });
    assert_eq!(
        rig.visited(),
        vec![
            StateId::PhotoCapture,
            StateId::VideoCapture,
            StateId::Convert,
            StateId::Thumbnail,
            StateId::Notify,
            StateId::Idle,
        ]
    );

    // IR warmup, then one refresh per second up to the length cap.
    let sleeps = rig.clock.sleeps();
    assert_eq!(sleeps[0], Duration::from_secs(2));
    assert_eq!(sleeps.len(), 1 + 12);
    assert_eq!(rig.hw.count(&HwCall::Annotate), 12);

    // Illumination on first, off by the end.
    assert_eq!(rig.hw.calls.first(), Some(&HwCall::Illumination(true)));
    assert!(!rig.hw.ir_on());
    assert_eq!(rig.hw.count(&HwCall::StopRecording), 1);

    // Artifacts.
    let video = rig.config.base.data_dir.join("20240601120000.mp4");
    assert!(video.exists());
    assert!(!rig.raw_path().exists(), "raw recording must be removed");

    // Mosaic of 9 evenly spaced frames out of 300.
    assert_eq!(rig.notifier.requests.len(), 1);
    let request = &rig.notifier.requests[0];
    assert_eq!(request.stamp, "20240601120000");
    let mosaic = request.mosaic.as_ref().expect("mosaic attached");
    assert_eq!(mosaic.frames, vec![0, 33, 66, 99, 132, 165, 198, 231, 264]);
    assert_eq!(mosaic.side, 3);
    assert_eq!(
        request.photo.as_deref(),
        Some(rig.config.base.data_dir.join("20240601120000.jpg").as_path())
    );

    // Streak untouched, last motion is the last moving frame.
    assert_eq!(rig.service.throttle().false_alarm_count, 0);
    assert_eq!(
        rig.service.throttle().last_motion_time,
        Some(Duration::from_secs(5))
    );
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::SessionEnded {
            outcome: SessionOutcome::Completed { notified: true },
            ..
        })
    ));
}

#[test]
fn failed_photo_does_not_stop_the_session() {
    let mut rig = Rig::new();
    rig.hw.photo_fails = true;
    rig.hw.motion_frames = 10;

    assert_eq!(rig.edge(), SessionOutcome::Completed { notified: true });
    assert!(rig.hw.transcoded());
    assert_eq!(rig.notifier.requests[0].photo, None);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PhotoSaved(_))),
        0
    );
}

#[test]
fn undelivered_mail_still_completes_the_session() {
    let mut rig = Rig::new();
    rig.hw.motion_frames = 6;
    rig.notifier.outcome = NotifyOutcome::LinkDown;

    assert_eq!(rig.edge(), SessionOutcome::Completed { notified: false });
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::Notified(NotifyOutcome::LinkDown))),
        1
    );
}

#[test]
fn camera_that_cannot_record_skips_the_video() {
    let mut rig = Rig::new();
    rig.hw.recording_fails = true;

    assert_eq!(rig.edge(), SessionOutcome::Completed { notified: false });
    assert!(!rig.hw.transcoded());
    assert!(rig.notifier.requests.is_empty());
    assert!(!rig.hw.ir_on());
    assert_eq!(rig.service.throttle().last_motion_time, None);
}

// ── False alarms and throttle ─────────────────────────────────

#[test]
fn quiet_recording_is_a_false_alarm() {
    let mut rig = Rig::new();

    assert_eq!(rig.edge(), SessionOutcome::FalseAlarm { throttled: false });

    assert!(!rig.hw.transcoded());
    assert!(rig.notifier.requests.is_empty());
    assert!(!rig.hw.ir_on());
    assert!(!rig.raw_path().exists());
    assert_eq!(rig.service.throttle().false_alarm_count, 1);
    // Checked at the threshold time, not at the length cap.
    assert_eq!(rig.hw.count(&HwCall::Annotate), 10);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::FalseAlarm {
            motion_frames: 1,
            streak: 1
        }
    )));
}

#[test]
fn third_false_alarm_in_a_row_throttles() {
    let mut rig = Rig::new();

    assert_eq!(rig.edge(), SessionOutcome::FalseAlarm { throttled: false });
    assert_eq!(rig.edge(), SessionOutcome::FalseAlarm { throttled: false });
    assert!(!rig.clock.slept_at_least(Duration::from_secs(600)));

    assert_eq!(rig.edge(), SessionOutcome::FalseAlarm { throttled: true });
    assert!(rig.clock.slept_at_least(Duration::from_secs(600)));
    assert_eq!(rig.service.throttle().false_alarm_count, 0);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::Throttled { delay_secs: 600 })),
        1
    );
    assert_eq!(rig.service.sessions(), 3);
}

#[test]
fn genuine_capture_breaks_the_streak() {
    let mut rig = Rig::new();
    rig.edge();
    rig.edge();
    assert_eq!(rig.service.throttle().false_alarm_count, 2);

    rig.hw.motion_frames = 6;
    assert_eq!(rig.edge(), SessionOutcome::Completed { notified: true });
    assert_eq!(rig.service.throttle().false_alarm_count, 0);

    rig.hw.motion_frames = 0;
    assert_eq!(rig.edge(), SessionOutcome::FalseAlarm { throttled: false });
    assert_eq!(rig.service.throttle().false_alarm_count, 1);
}

#[test]
fn forced_session_keeps_a_quiet_recording() {
    let mut rig = Rig::new();
    rig.hw.level = false;

    assert_eq!(rig.forced(), SessionOutcome::Completed { notified: true });
    assert!(rig.hw.transcoded());
    assert_eq!(rig.notifier.requests.len(), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::FalseAlarm { .. })),
        0
    );
}

// ── Aborts, cancellation, cooldown ────────────────────────────

#[test]
fn conversion_failure_aborts_but_cleans_up() {
    let mut rig = Rig::new();
    rig.hw.motion_frames = 6;
    rig.hw.transcode_fails = true;

    let outcome = rig.edge();

    assert!(matches!(outcome, SessionOutcome::Aborted(_)), "{outcome:?}");
    assert_eq!(rig.service.state(), StateId::Idle);
    assert!(rig.notifier.requests.is_empty());
    assert!(!rig.hw.ir_on());
    assert!(!rig.hw.is_recording());
    assert!(!rig.raw_path().exists());
    assert!(matches!(
        rig.sink.events.last(),
        Some(AppEvent::SessionEnded {
            outcome: SessionOutcome::Aborted(_),
            ..
        })
    ));
}

#[test]
fn shutdown_mid_recording_cancels_the_session() {
    // Warmup plus two refreshes, then shutdown.
    let mut rig = Rig::with_clock(FakeClock::interrupt_after(3), |_| {});
    rig.hw.motion_frames = 6;

    assert_eq!(rig.edge(), SessionOutcome::Cancelled);

    assert_eq!(rig.service.state(), StateId::Idle);
    assert!(!rig.hw.is_recording());
    assert_eq!(rig.hw.count(&HwCall::StopRecording), 1);
    assert!(!rig.hw.ir_on());
    assert!(!rig.hw.transcoded());
    assert!(!rig.raw_path().exists());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SessionEnded { .. })),
        0
    );
}

#[test]
fn cooldown_follows_a_session_but_not_an_ignored_trigger() {
    let mut rig = Rig::with(|c| c.base.cooldown_secs = 30);

    rig.hw.level = false;
    rig.edge();
    assert!(rig.clock.sleeps().is_empty());

    rig.hw.level = true;
    rig.hw.motion_frames = 6;
    rig.edge();
    assert_eq!(rig.clock.sleeps().last(), Some(&Duration::from_secs(30)));
}

#[test]
fn each_transition_and_summary_reaches_the_sink_once() {
    let mut rig = Rig::new();
    rig.hw.motion_frames = 6;
    rig.edge();

    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::StateChanged { .. })),
        6
    );
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::SessionEnded { .. })),
        1
    );
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::Triggered(_))),
        1
    );
}
