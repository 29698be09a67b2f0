//! Battery gauge: MCP3008 10-bit ADC behind a resistive divider.
//!
//! ## Measurement
//!
//! Ten samples 100 ms apart are averaged, scaled by the ADC reference
//! and the divider ratio, and mapped linearly onto the configured
//! `[voltage_min, voltage_max]` window:
//!
//! ```text
//!   volts   = avg / full_scale × vref × divider
//!   percent = clamp((volts − min) / (max − min) × 100, 0, 100)
//! ```

use std::time::Duration;

use embedded_hal::spi::{Operation, SpiDevice};

use crate::app::ports::{AdcPort, Clock};
use crate::config::TelemetryConfig;
use crate::error::{Result, SensorError};

pub const SAMPLE_COUNT: u32 = 10;
pub const SAMPLE_SPACING: Duration = Duration::from_millis(100);

// ── MCP3008 ───────────────────────────────────────────────────

/// 8-channel, 10-bit SPI ADC.
pub struct Mcp3008<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Mcp3008<SPI> {
    pub const FULL_SCALE: u16 = 1023;

    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }
}

impl<SPI: SpiDevice> AdcPort for Mcp3008<SPI> {
    fn read_raw(&mut self, channel: u8) -> core::result::Result<u16, SensorError> {
        if channel > 7 {
            return Err(SensorError::InvalidChannel(channel));
        }
        // Start bit, single-ended + channel, then clock out 10 bits.
        let mut buf = [0x01, (0x08 | channel) << 4, 0x00];
        self.spi
            .transaction(&mut [Operation::TransferInPlace(&mut buf)])
            .map_err(|_| SensorError::AdcReadFailed)?;
        Ok((u16::from(buf[1] & 0x03) << 8) | u16::from(buf[2]))
    }

    fn full_scale(&self) -> u16 {
        Self::FULL_SCALE
    }
}

// ── Gauge ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub volts: f32,
    pub percent: u8,
}

#[derive(Debug, Clone)]
pub struct BatteryGauge {
    channel: u8,
    vref: f32,
    divider_ratio: f32,
    voltage_min: f32,
    voltage_max: f32,
}

impl BatteryGauge {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            channel: config.adc_channel,
            vref: config.adc_vref,
            divider_ratio: config.divider_ratio,
            voltage_min: config.voltage_min,
            voltage_max: config.voltage_max,
        }
    }

    /// Take [`SAMPLE_COUNT`] samples and convert the average.
    pub fn read(&self, adc: &mut impl AdcPort, clock: &impl Clock) -> Result<BatteryReading> {
        let mut sum: u32 = 0;
        for i in 0..SAMPLE_COUNT {
            if i > 0 {
                clock.sleep(SAMPLE_SPACING)?;
            }
            sum += u32::from(adc.read_raw(self.channel)?);
        }
        let avg = sum as f32 / SAMPLE_COUNT as f32;
        let volts = avg / f32::from(adc.full_scale()) * self.vref * self.divider_ratio;
        Ok(BatteryReading {
            volts,
            percent: self.percent_for(volts),
        })
    }

    /// Linear charge estimate, clamped to 0–100.
    pub fn percent_for(&self, volts: f32) -> u8 {
        let span = self.voltage_max - self.voltage_min;
        if span <= 0.0 {
            return 0;
        }
        ((volts - self.voltage_min) / span * 100.0)
            .clamp(0.0, 100.0)
            .round() as u8
    }
}
