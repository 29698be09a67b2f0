//! Modem power driver.
//!
//! The power-key line is inverted by the driver transistor: driving it
//! LOW powers the modem, HIGH cuts it.  Callers only ever say on/off.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::ModemPowerPort;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    Off,
    On,
}

pub struct ModemPower<P> {
    pin: P,
    state: ModemState,
}

impl<P: OutputPin> ModemPower<P> {
    /// Takes ownership of the pin and powers the modem down.  If that
    /// write fails the modem is assumed to be off.
    pub fn new(pin: P) -> Self {
        let mut modem = Self {
            pin,
            state: ModemState::Off,
        };
        if let Err(e) = modem.drive(false) {
            warn!("Modem power line: {e}");
        }
        modem
    }

    pub fn state(&self) -> ModemState {
        self.state
    }

    fn drive(&mut self, on: bool) -> Result<(), ActuatorError> {
        // Inverted polarity.
        let res = if on {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.state = if on { ModemState::On } else { ModemState::Off };
        Ok(())
    }
}

impl<P: OutputPin> ModemPowerPort for ModemPower<P> {
    fn set_power(&mut self, on: bool) -> Result<(), ActuatorError> {
        if (self.state == ModemState::On) != on {
            info!("Modem power {}", if on { "on" } else { "off" });
        }
        self.drive(on)
    }
}
