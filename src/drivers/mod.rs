//! Device drivers over the `embedded-hal` traits.
//!
//! Drivers are dumb: they own a line and know its polarity.  Policy
//! (when the LED is on, when the modem powers up) lives in the domain.

pub mod ir_led;
pub mod modem_power;
pub mod motion_sensor;

use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

/// An output line that may be missing because it could not be requested
/// at boot.  Every write to a missing line fails, so the driver above it
/// reports the failure per call instead of the daemon refusing to start.
pub struct OptionalPin<P>(Option<P>);

impl<P> OptionalPin<P> {
    pub fn attached(pin: P) -> Self {
        Self(Some(pin))
    }

    pub fn missing() -> Self {
        Self(None)
    }

    pub fn is_attached(&self) -> bool {
        self.0.is_some()
    }
}

impl<P: OutputPin> ErrorType for OptionalPin<P> {
    type Error = ErrorKind;
}

impl<P: OutputPin> OutputPin for OptionalPin<P> {
    fn set_low(&mut self) -> Result<(), ErrorKind> {
        match &mut self.0 {
            Some(pin) => pin.set_low().map_err(|e| digital::Error::kind(&e)),
            None => Err(ErrorKind::Other),
        }
    }

    fn set_high(&mut self) -> Result<(), ErrorKind> {
        match &mut self.0 {
            Some(pin) => pin.set_high().map_err(|e| digital::Error::kind(&e)),
            None => Err(ErrorKind::Other),
        }
    }
}
