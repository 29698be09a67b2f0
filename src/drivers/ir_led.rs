//! IR illuminator driver (850 nm LED bank behind a logic-level MOSFET).
//!
//! Active HIGH.  The capture controller keeps it on for the photo and
//! video span only; the lifecycle teardown forces it off.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::IlluminationPort;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrState {
    Off,
    On,
}

pub struct IrLed<P> {
    pin: P,
    state: IrState,
}

impl<P: OutputPin> IrLed<P> {
    /// Takes ownership of the pin and drives it low.  A failed write is
    /// logged; later calls report their own failures.
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("IR LED line could not be driven low");
        }
        Self {
            pin,
            state: IrState::Off,
        }
    }

    pub fn on(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_high().map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.state = IrState::On;
        debug!("IR LED on");
        Ok(())
    }

    pub fn off(&mut self) -> Result<(), ActuatorError> {
        self.pin.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.state = IrState::Off;
        debug!("IR LED off");
        Ok(())
    }

    pub fn state(&self) -> IrState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == IrState::On
    }
}

impl<P: OutputPin> IlluminationPort for IrLed<P> {
    fn set_illumination(&mut self, on: bool) -> Result<(), ActuatorError> {
        if on { self.on() } else { self.off() }
    }
}
