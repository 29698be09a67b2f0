//! Default line and bus assignments for the PiCam board.
//!
//! These seed the `[gpio]` and `[telemetry]` configuration sections.  The
//! numbers are BCM line offsets on the Raspberry Pi's main GPIO chip.

// ---------------------------------------------------------------------------
// GPIO character device
// ---------------------------------------------------------------------------

pub const GPIO_CHIP: &str = "/dev/gpiochip0";

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// IR illuminator MOSFET gate (active HIGH).
pub const IR_LED_LINE: u32 = 17;
/// Modem power-key transistor.  Inverted: LOW powers the modem.
pub const MODEM_POWER_LINE: u32 = 27;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// PIR motion sensor output (HIGH while motion is detected).
pub const MOTION_SENSOR_LINE: u32 = 4;

// ---------------------------------------------------------------------------
// MCP3008 ADC on SPI0
// ---------------------------------------------------------------------------

pub const ADC_SPI_DEVICE: &str = "/dev/spidev0.0";
/// Battery voltage divider input.
pub const BATTERY_ADC_CHANNEL: u8 = 0;
/// SPI clock for the MCP3008 at 3.3 V.
pub const ADC_SPI_HZ: u32 = 1_000_000;
