//! Telemetry sampler: individual sources and the aggregating [`TelemetrySampler`].
//!
//! The sampler owns the battery ADC and the host probe and produces one
//! [`TelemetryReading`] per call.  It is read-only with respect to the
//! rest of the system, so it is safe to sample in the middle of a capture
//! session (the end-of-session log line does exactly that).

pub mod battery;
pub mod system;

use std::path::PathBuf;

use log::warn;

use crate::app::ports::{AdcPort, Clock, SystemStatsPort, TelemetryPort};
use crate::config::SystemConfig;
use crate::error::Error;
use battery::BatteryGauge;

/// One status sample.  Missing values render as `n/a`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryReading {
    pub battery_percent: Option<u8>,
    pub battery_volts: Option<f32>,
    pub cpu_temp_c: Option<f32>,
    pub disk_percent: Option<f32>,
}

impl TelemetryReading {
    /// `true` when the battery is known to be below `threshold` percent.
    pub fn is_low_battery(&self, threshold: u8) -> bool {
        self.battery_percent.is_some_and(|p| p < threshold)
    }
}

impl core::fmt::Display for TelemetryReading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (self.battery_percent, self.battery_volts) {
            (Some(p), Some(v)) => write!(f, "Battery: {p}% ({v:.2}V)")?,
            _ => f.write_str("Battery: n/a")?,
        }
        match self.cpu_temp_c {
            Some(t) => write!(f, " | CPU: {t:.1}C")?,
            None => f.write_str(" | CPU: n/a")?,
        }
        match self.disk_percent {
            Some(d) => write!(f, " | Disk: {d:.0}%"),
            None => f.write_str(" | Disk: n/a"),
        }
    }
}

/// Aggregates every telemetry source behind [`TelemetryPort`].
///
/// The ADC is optional: without one (the SPI device failed to open at
/// boot) battery values are always unknown.
pub struct TelemetrySampler<A, S, C> {
    adc: Option<A>,
    stats: S,
    clock: C,
    gauge: BatteryGauge,
    data_dir: PathBuf,
}

impl<A: AdcPort, S: SystemStatsPort, C: Clock> TelemetrySampler<A, S, C> {
    pub fn new(adc: Option<A>, stats: S, clock: C, config: &SystemConfig) -> Self {
        Self {
            adc,
            stats,
            clock,
            gauge: BatteryGauge::new(&config.telemetry),
            data_dir: config.base.data_dir.clone(),
        }
    }
}

impl<A: AdcPort, S: SystemStatsPort, C: Clock> TelemetryPort for TelemetrySampler<A, S, C> {
    fn sample(&mut self) -> TelemetryReading {
        let battery = match self.adc.as_mut().map(|adc| self.gauge.read(adc, &self.clock)) {
            Some(Ok(b)) => Some(b),
            None | Some(Err(Error::Interrupted(_))) => None,
            Some(Err(e)) => {
                warn!("Battery read failed: {e}");
                None
            }
        };
        TelemetryReading {
            battery_percent: battery.map(|b| b.percent),
            battery_volts: battery.map(|b| b.volts),
            cpu_temp_c: self.stats.cpu_temp_c(),
            disk_percent: self.stats.disk_usage_percent(&self.data_dir),
        }
    }
}
