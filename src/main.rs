//! PiCam: main entry point.
//!
//! Hexagonal architecture with a single trigger-driven worker.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        Notifier            LogEventSink       │
//! │  (camera, IR, sensor,   (modem, PppLink,    (EventSink)        │
//! │   ffmpeg, telemetry)     SmtpMailer)        SystemClock        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            CaptureService (pure logic)                  │    │
//! │  │  FSM · ThrottleState · MotionTally                      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  GpioEdgeWatcher ──offer──▶ TriggerQueue ──run──▶ worker       │
//! │  signal thread ──────────▶ Shutdown ──────────▶ teardown       │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, OpenOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use linux_embedded_hal::CdevPin;
use log::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use picam::adapters::camera::RaspiCamera;
use picam::adapters::ffmpeg::Ffmpeg;
use picam::adapters::gpio::{self, GpioEdgeWatcher};
use picam::adapters::hardware::HardwareAdapter;
use picam::adapters::log_sink::LogEventSink;
use picam::adapters::ppp::PppLink;
use picam::adapters::smtp::SmtpMailer;
use picam::adapters::time::SystemClock;
use picam::app::ports::{Clock, TelemetryPort};
use picam::app::service::CaptureService;
use picam::config::{DEFAULT_CONFIG_PATH, SystemConfig};
use picam::drivers::OptionalPin;
use picam::drivers::ir_led::IrLed;
use picam::drivers::modem_power::ModemPower;
use picam::drivers::motion_sensor::SensorLevel;
use picam::events::{TriggerEvent, trigger_queue};
use picam::lifecycle;
use picam::notify::Notifier;
use picam::power::LinkController;
use picam::sensors::TelemetrySampler;
use picam::sensors::battery::Mcp3008;
use picam::sensors::system::SystemProbe;

const LOG_FILE: &str = "picam.log";

#[derive(Debug, Parser)]
#[command(name = "picam", version, about = "Motion-triggered camera trap")]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,

    /// Do not run a forced capture right after start.
    #[arg(long)]
    no_startup_check: bool,
}

// ── Logging ───────────────────────────────────────────────────

/// Terminal: stdout at `debug`.  Otherwise append to the data-directory
/// log file at `info`, no colours.  `RUST_LOG` overrides the level.
fn init_logging(config: &SystemConfig) -> Result<()> {
    let interactive = std::io::stdout().is_terminal();
    let default = if interactive { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if interactive {
        builder.init();
    } else {
        let path = config.base.data_dir.join(LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    Ok(())
}

/// Request an output line, or log why not and hand back a missing one.
fn output_line(chip: &Path, line: u32, initial: bool, what: &str) -> OptionalPin<CdevPin> {
    match gpio::output_pin(chip, line, initial) {
        Ok(pin) => OptionalPin::attached(pin),
        Err(e) => {
            warn!("{what} line {line} unavailable: {e}");
            OptionalPin::missing()
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration (errors here are fatal) ────────────
    let config = SystemConfig::load(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    if cli.check_config {
        println!("{}: ok", cli.config.display());
        return Ok(());
    }

    fs::create_dir_all(&config.base.data_dir)
        .with_context(|| format!("creating {}", config.base.data_dir.display()))?;
    init_logging(&config)?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PiCam v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Shutdown plumbing ──────────────────────────────────
    let (shutdown, listener) = lifecycle::shutdown_channel();
    lifecycle::spawn_signal_thread(shutdown).context("installing signal handlers")?;
    let clock = SystemClock::new(listener.clone());

    // ── 3. Outputs (IR off, modem off) ────────────────────────
    // A line that cannot be requested is left missing: its driver then
    // fails per call and the rest of the daemon keeps running.
    let gpio_cfg = &config.gpio;
    let ir = IrLed::new(output_line(&gpio_cfg.chip, gpio_cfg.ir_led_pin, false, "IR LED"));
    let modem = ModemPower::new(output_line(
        &gpio_cfg.chip,
        gpio_cfg.modem_power_pin,
        true,
        "modem power",
    ));

    // ── 4. Telemetry + capture hardware ───────────────────────
    let adc = match gpio::adc_spi(&config.telemetry.spi_device) {
        Ok(spi) => Some(Mcp3008::new(spi)),
        Err(e) => {
            warn!(
                "Battery ADC unavailable ({}): {e}; battery will read n/a",
                config.telemetry.spi_device.display()
            );
            None
        }
    };
    let sampler = TelemetrySampler::new(adc, SystemProbe::new(), clock.clone(), &config);

    let level = SensorLevel::new(false);
    let mut hw = HardwareAdapter::new(
        RaspiCamera::new(&config.camera, clock.epoch()),
        ir,
        level.clone(),
        Ffmpeg::new(&config.base),
        sampler,
    );
    info!("Telemetry at start: {}", hw.sample());

    // ── 5. Notifier over the dial-up link ─────────────────────
    let link = LinkController::new(PppLink::new(&config.modem), clock.clone(), &config.modem);
    let mut notifier = Notifier::new(link, modem, SmtpMailer::new(&config.smtp), &config);

    // ── 6. Capture service ────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = CaptureService::new(config.clone(), Arc::new(clock.clone()));

    // ── 7. Trigger sources ────────────────────────────────────
    let (producer, consumer) = trigger_queue();
    let channel = gpio_cfg.motion_sensor_pin;
    let edge_producer = producer.clone();
    let edge_clock = clock.clone();
    let watcher = GpioEdgeWatcher::subscribe(
        &gpio_cfg.chip,
        channel,
        gpio_cfg.debounce_ms,
        level,
        move || {
            edge_producer.offer(TriggerEvent::edge(channel, edge_clock.uptime()));
        },
    );
    if let Err(e) = &watcher {
        warn!("Motion sensor line {channel} unavailable: {e}; only forced triggers will run");
    }

    if cli.no_startup_check {
        info!("Startup check skipped");
    } else if !producer.offer(TriggerEvent::forced(channel, clock.uptime())) {
        warn!("Startup check not queued");
    }

    // ── 8. Worker loop (returns on shutdown) ──────────────────
    info!("Waiting for motion on line {channel}");
    consumer.run(&listener, |event| {
        let outcome = service.handle_trigger(event, &mut hw, &mut notifier, &mut sink);
        debug!("Trigger handled: {outcome:?}");
    });

    // ── 9. Teardown ───────────────────────────────────────────
    info!(
        "Shutting down after {} session(s), {} trigger(s) dropped while busy",
        service.sessions(),
        consumer.dropped()
    );
    lifecycle::teardown(&mut hw, &mut notifier);
    Ok(())
}
