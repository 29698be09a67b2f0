//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the camera trap: trigger
//! gating, the capture state machine, false-alarm throttling and the
//! hand-off to the notifier.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without a camera, a modem or GPIO lines.

pub mod events;
pub mod ports;
pub mod service;
