//! PiCam camera-trap library.
//!
//! Exposes the capture pipeline and its adapters for the binary and for
//! integration testing.  Linux GPIO/SPI bindings are behind the `rpi`
//! feature; everything else builds and tests on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod lifecycle;
pub mod motion;
pub mod notify;
pub mod pins;
pub mod power;
pub mod sensors;
