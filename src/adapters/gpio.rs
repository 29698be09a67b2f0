//! Linux GPIO character-device and spidev bindings.
//!
//! Output lines are handed to the drivers as `embedded-hal` `OutputPin`s
//! ([`CdevPin`]); the battery ADC gets an `embedded-hal` `SpiDevice`
//! ([`SpidevDevice`]).  The motion sensor line is watched for edges on a
//! dedicated thread.

use std::io;
use std::path::Path;
use std::thread::JoinHandle;

use linux_embedded_hal::gpio_cdev::{Chip, EventRequestFlags, EventType, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, SpidevDevice};
use log::{debug, info, warn};

use crate::drivers::motion_sensor::{Edge, EdgeDebouncer, SensorLevel};
use crate::pins;

const CONSUMER: &str = "picam";

fn to_io(e: impl std::fmt::Debug) -> io::Error {
    io::Error::other(format!("{e:?}"))
}

/// Request `line` on `chip` as an output at `initial` level.
pub fn output_pin(chip: &Path, line: u32, initial: bool) -> io::Result<CdevPin> {
    let mut chip = Chip::new(chip).map_err(to_io)?;
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(LineRequestFlags::OUTPUT, u8::from(initial), CONSUMER))
        .map_err(to_io)?;
    CdevPin::new(handle).map_err(to_io)
}

/// Open the ADC's SPI device in mode 0.
pub fn adc_spi(path: &Path) -> io::Result<SpidevDevice> {
    let mut dev = SpidevDevice::open(path).map_err(to_io)?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(pins::ADC_SPI_HZ)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    dev.0.configure(&options)?;
    Ok(dev)
}

/// Edge subscription on the motion sensor line.
pub struct GpioEdgeWatcher;

impl GpioEdgeWatcher {
    /// Watch both edges of `line`.  Keeps `level` current and calls
    /// `handler` once per debounced rising edge.
    pub fn subscribe<F>(
        chip: &Path,
        line: u32,
        debounce_ms: u32,
        level: SensorLevel,
        mut handler: F,
    ) -> io::Result<JoinHandle<()>>
    where
        F: FnMut() + Send + 'static,
    {
        let mut chip = Chip::new(chip).map_err(to_io)?;
        let events = chip
            .get_line(line)
            .and_then(|l| l.events(LineRequestFlags::INPUT, EventRequestFlags::BOTH_EDGES, CONSUMER))
            .map_err(to_io)?;
        let initial = events.get_value().map_err(to_io)? != 0;
        level.set(initial);
        info!("GPIO: watching line {line}, level {}", u8::from(initial));

        let mut debouncer = EdgeDebouncer::new(debounce_ms);
        std::thread::Builder::new()
            .name("motion-edges".into())
            .spawn(move || {
                for event in events {
                    let event = match event {
                        Ok(e) => e,
                        Err(e) => {
                            warn!("GPIO: event read failed: {e}");
                            break;
                        }
                    };
                    let edge = match event.event_type() {
                        EventType::RisingEdge => Edge::Rising,
                        EventType::FallingEdge => Edge::Falling,
                    };
                    level.set(edge == Edge::Rising);
                    // Kernel timestamps are nanoseconds.
                    if debouncer.on_edge(edge, event.timestamp() / 1_000_000) {
                        handler();
                    } else {
                        debug!("GPIO: {edge:?} edge filtered");
                    }
                }
            })
    }
}
