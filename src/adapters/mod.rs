//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                         | Connects to                 |
//! |-------------|------------------------------------|-----------------------------|
//! | `camera`    | CameraPort                         | raspistill / raspivid       |
//! | `ffmpeg`    | TranscoderPort, FrameSourcePort    | ffmpeg / ffprobe            |
//! | `gpio`      | (edge watcher, pin/SPI factories)  | /dev/gpiochip*, /dev/spidev*|
//! | `hardware`  | CaptureHardware (all of the above) | camera, IR LED, sensor, ADC |
//! | `log_sink`  | EventSink                          | log facade                  |
//! | `ppp`       | LinkPort                           | pon / pppd, `ppp0` counters |
//! | `smtp`      | MailTransport                      | SMTP relay (lettre)         |
//! | `time`      | Clock                              | Instant, local time, shutdown|

pub mod camera;
pub mod ffmpeg;
#[cfg(feature = "rpi")]
pub mod gpio;
pub mod hardware;
pub mod log_sink;
pub mod ppp;
pub mod smtp;
pub mod time;
