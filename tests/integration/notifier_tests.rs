//! Integration tests for the Notifier → LinkController → mailer chain,
//! and for a whole session delivering through it.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tempfile::TempDir;

use picam::app::ports::NotifyPort;
use picam::app::service::{CaptureService, SessionOutcome};
use picam::config::SystemConfig;
use picam::events::TriggerEvent;
use picam::notify::mail::{LOW_BATTERY_LINE, SUBJECT};
use picam::notify::mosaic::Mosaic;
use picam::notify::{Notifier, NotifyOutcome, NotifyRequest};
use picam::power::LinkController;
use picam::sensors::TelemetryReading;

use crate::mock_hw::{
    FakeClock, MockHardware, MockLink, MockMailer, MockModem, RecordingSink, test_config,
};

type TestNotifier = Notifier<MockLink, MockModem, MockMailer, Arc<FakeClock>>;

fn notifier(config: &SystemConfig, link: MockLink, clock: &Arc<FakeClock>) -> TestNotifier {
    Notifier::new(
        LinkController::new(link, Arc::clone(clock), &config.modem),
        MockModem::default(),
        MockMailer::default(),
        config,
    )
}

fn request(battery: u8) -> NotifyRequest {
    NotifyRequest {
        stamp: "20240601120000".into(),
        mosaic: Some(Mosaic {
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            side: 1,
            frames: vec![0],
        }),
        photo: None,
        telemetry: TelemetryReading {
            battery_percent: Some(battery),
            battery_volts: Some(11.9),
            cpu_temp_c: None,
            disk_percent: None,
        },
    }
}

// ── Delivery ──────────────────────────────────────────────────

#[test]
fn link_up_sends_and_tears_everything_down() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let clock = Arc::new(FakeClock::new());
    let mut n = notifier(&config, MockLink::up_on(3), &clock);

    assert_eq!(n.deliver(&request(80)), NotifyOutcome::Sent);

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 2]);
    assert_eq!(n.mailer().sent.len(), 1);
    let mail = &n.mailer().sent[0];
    assert_eq!(mail.subject, SUBJECT);
    assert_eq!(mail.attachments[0].filename, "20240601120000-mosaic.jpg");
    assert!(!mail.body.contains(LOW_BATTERY_LINE));

    assert_eq!(n.modem().history, vec![true, false]);
    assert_eq!(n.link().port().killed, 1);
    assert_eq!(n.link().port().locks_removed, 1);
    assert!(!n.link().session().connected);
}

#[test]
fn link_timeout_drops_the_mail() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.modem.ppp_timeout = 3;
    let clock = Arc::new(FakeClock::new());
    let mut n = notifier(&config, MockLink::never_up(), &clock);

    assert_eq!(n.deliver(&request(80)), NotifyOutcome::LinkDown);

    assert!(n.mailer().sent.is_empty());
    assert_eq!(n.link().port().polls, 4);
    assert_eq!(clock.sleeps().len(), 3);
    assert_eq!(n.modem().history, vec![true, false]);
    assert_eq!(n.link().port().killed, 1);
}

#[test]
fn relay_refusal_is_reported_and_link_still_closed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let clock = Arc::new(FakeClock::new());
    let link = LinkController::new(MockLink::up_on(1), Arc::clone(&clock), &config.modem);
    let mailer = MockMailer {
        refuse: true,
        ..MockMailer::default()
    };
    let mut n = Notifier::new(link, MockModem::default(), mailer, &config);

    assert_eq!(n.deliver(&request(80)), NotifyOutcome::DeliveryFailed);
    assert!(clock.sleeps().is_empty());
    assert_eq!(n.modem().history, vec![true, false]);
    assert_eq!(n.link().port().locks_removed, 1);
}

#[test]
fn low_battery_is_flagged_in_the_body() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let clock = Arc::new(FakeClock::new());
    let mut n = notifier(&config, MockLink::up_on(1), &clock);

    n.deliver(&request(config.telemetry.low_battery_percent - 1));

    let body = &n.mailer().sent[0].body;
    assert!(body.starts_with(LOW_BATTERY_LINE), "{body}");
    assert!(body.contains("Battery: 19% (11.90V)"));
}

#[test]
fn photo_preview_is_attached_when_enabled() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.smtp.attach_photo = true;
    let photo = config.base.data_dir.join("20240601120000.jpg");
    RgbImage::new(64, 48).save(&photo).unwrap();

    let clock = Arc::new(FakeClock::new());
    let mut n = notifier(&config, MockLink::up_on(1), &clock);
    let mut req = request(80);
    req.photo = Some(photo);

    assert_eq!(n.deliver(&req), NotifyOutcome::Sent);

    let mail = &n.mailer().sent[0];
    let names: Vec<_> = mail.attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, ["20240601120000-mosaic.jpg", "20240601120000.jpg"]);
    assert!(mail.body.ends_with("Photo: 20240601120000.jpg"));
    let preview = image::load_from_memory(&mail.attachments[1].data).unwrap();
    assert_eq!((preview.width(), preview.height()), (16, 12));
}

#[test]
fn missing_photo_file_only_loses_the_preview() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.smtp.attach_photo = true;
    let clock = Arc::new(FakeClock::new());
    let mut n = notifier(&config, MockLink::up_on(1), &clock);
    let mut req = request(80);
    req.photo = Some(config.base.data_dir.join("gone.jpg"));

    assert_eq!(n.deliver(&req), NotifyOutcome::Sent);
    assert_eq!(n.mailer().sent[0].attachments.len(), 1);
}

#[test]
fn shutdown_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let clock = Arc::new(FakeClock::new());
    let mut n = notifier(&config, MockLink::never_up(), &clock);

    n.shutdown();
    n.shutdown();

    assert_eq!(n.modem().history, vec![false, false]);
    assert_eq!(n.link().port().killed, 0);
    assert_eq!(n.link().port().locks_removed, 2);
}

// ── Whole session ─────────────────────────────────────────────

#[test]
fn motion_session_delivers_mosaic_over_the_link() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.camera.video_max_length = 12;
    config.motion.threshold_time = 10;
    config.motion.threshold_count = 5;
    config.camera.video_thumbnails_num = 9;

    let clock = Arc::new(FakeClock::new());
    let mut service = CaptureService::new(config.clone(), clock.clone());
    let mut hw = MockHardware::new();
    hw.motion_frames = 6;
    let mut n = notifier(&config, MockLink::up_on(5), &clock);
    let mut sink = RecordingSink::new();

    let outcome = service.handle_trigger(
        TriggerEvent::edge(17, Duration::ZERO),
        &mut hw,
        &mut n,
        &mut sink,
    );

    assert_eq!(outcome, SessionOutcome::Completed { notified: true });
    assert!(!hw.ir_on());

    let mail = &n.mailer().sent[0];
    assert_eq!(mail.subject, "PiCam Triggered!");
    assert_eq!(mail.attachments.len(), 1);
    let mosaic = image::load_from_memory(&mail.attachments[0].data).unwrap();
    assert_eq!((mosaic.width(), mosaic.height()), (48, 36));
    assert!(mail.body.contains("Photo: 20240601120000.jpg"));

    // Warmup, 12 refreshes, then four one-second link polls.
    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 1 + 12 + 4);
    assert_eq!(n.modem().history, vec![true, false]);
}
