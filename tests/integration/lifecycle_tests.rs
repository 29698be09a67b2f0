//! Shutdown and teardown across the worker loop, the capture service and
//! the notifier.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use picam::app::ports::{CameraPort, CaptureHardware, IlluminationPort};
use picam::app::service::{CaptureService, SessionOutcome};
use picam::events::{TriggerEvent, trigger_queue};
use picam::lifecycle::{self, shutdown_channel};
use picam::notify::Notifier;
use picam::power::LinkController;

use crate::mock_hw::{
    FakeClock, HwCall, MockHardware, MockLink, MockMailer, MockModem, MockNotifier,
    RecordingSink, test_config,
};

#[test]
fn teardown_twice_leaves_outputs_safe() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let clock = Arc::new(FakeClock::new());
    let mut hw = MockHardware::new();
    let mut notifier = Notifier::new(
        LinkController::new(MockLink::never_up(), clock, &config.modem),
        MockModem::default(),
        MockMailer::default(),
        &config,
    );
    hw.set_illumination(true).unwrap();

    lifecycle::teardown(&mut hw, &mut notifier);
    lifecycle::teardown(&mut hw, &mut notifier);

    assert!(!hw.ir_on());
    assert_eq!(hw.count(&HwCall::Close), 2);
    assert_eq!(hw.count(&HwCall::StopRecording), 0);
    assert_eq!(notifier.modem().history, vec![false, false]);
    assert!(notifier.mailer().sent.is_empty());
}

#[test]
fn release_stops_a_recording_left_running() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let mut hw = MockHardware::new();
    let analyzer = picam::motion::MotionAnalyzer::new(
        (&config.motion).into(),
        Arc::new(picam::motion::MotionTally::new()),
    );
    let settings = picam::app::ports::VideoSettings {
        resolution: config.camera.video_res,
        framerate: config.camera.framerate,
        rotation: 0,
        annotation: String::new(),
    };
    hw.start_recording(&config.base.tmp_dir.join("x.h264"), &settings, analyzer)
        .unwrap();

    hw.release();
    hw.release();

    assert!(!hw.is_recording());
    assert_eq!(hw.count(&HwCall::StopRecording), 1);
}

#[test]
fn worker_runs_the_startup_check_then_stops_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let clock = Arc::new(FakeClock::new());
    let mut service = CaptureService::new(config, clock);
    let mut hw = MockHardware::new();
    hw.level = false;
    let mut notifier = MockNotifier::new();
    let mut sink = RecordingSink::new();

    let (producer, consumer) = trigger_queue();
    let (shutdown, listener) = shutdown_channel();
    assert!(producer.offer(TriggerEvent::forced(17, Duration::ZERO)));

    let mut outcomes = Vec::new();
    consumer.run(&listener, |event| {
        outcomes.push(service.handle_trigger(event, &mut hw, &mut notifier, &mut sink));
        // An edge raised mid-session is dropped, never queued.
        assert!(!producer.offer(TriggerEvent::edge(17, Duration::from_secs(1))));
        shutdown.request();
    });
    lifecycle::teardown(&mut hw, &mut notifier);

    assert_eq!(outcomes, vec![SessionOutcome::Completed { notified: true }]);
    assert_eq!(consumer.dropped(), 1);
    assert_eq!(notifier.requests.len(), 1);
    assert_eq!(notifier.shutdowns, 1);
    assert!(!hw.ir_on());
}

#[test]
fn shutdown_during_throttle_delay_cancels_the_session() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.throttle.threshold = 1;
    // Warmup plus ten refreshes complete; the throttle delay does not.
    let clock = Arc::new(FakeClock::interrupt_after(11));
    let mut service = CaptureService::new(config, clock.clone());
    let mut hw = MockHardware::new();
    let mut notifier = MockNotifier::new();
    let mut sink = RecordingSink::new();

    let outcome = service.handle_trigger(
        TriggerEvent::edge(17, Duration::ZERO),
        &mut hw,
        &mut notifier,
        &mut sink,
    );

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert_eq!(clock.sleeps().len(), 11);
    assert_eq!(service.throttle().false_alarm_count, 0);
    assert!(!hw.ir_on());
}
