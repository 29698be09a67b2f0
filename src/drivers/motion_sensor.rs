//! PIR motion-sensor input: shared line level and rising-edge debounce.
//!
//! ## Hardware
//!
//! The PIR module drives its output HIGH while it sees motion.  The edge
//! watcher thread (see `adapters::gpio`) receives every edge from the
//! kernel with its timestamp, stores the new level into a
//! [`SensorLevel`], and runs the [`EdgeDebouncer`] to decide whether a
//! rising edge is a new trigger.
//!
//! | Edge    | Effect                                                   |
//! |---------|----------------------------------------------------------|
//! | Rising  | level = HIGH; trigger if ≥ `debounce_ms` since last one  |
//! | Falling | level = LOW                                              |

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::ports::MotionSensorPort;

/// Latest line level, written by the edge thread, read by the capture
/// controller.  Seeded from the line once at startup.
#[derive(Debug, Clone, Default)]
pub struct SensorLevel {
    high: Arc<AtomicBool>,
}

impl SensorLevel {
    pub fn new(initial: bool) -> Self {
        Self {
            high: Arc::new(AtomicBool::new(initial)),
        }
    }

    pub fn set(&self, high: bool) {
        self.high.store(high, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.high.load(Ordering::Acquire)
    }
}

impl MotionSensorPort for SensorLevel {
    fn read_level(&mut self) -> bool {
        self.get()
    }
}

/// Edge direction as reported by the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Rejects rising edges closer than `debounce_ms` to the last accepted one.
#[derive(Debug, Clone)]
pub struct EdgeDebouncer {
    debounce_ms: u64,
    last_accepted_ms: Option<u64>,
}

impl EdgeDebouncer {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms: u64::from(debounce_ms),
            last_accepted_ms: None,
        }
    }

    /// Feed one edge observed at `at_ms`.  Returns `true` if it is a new
    /// trigger.
    pub fn on_edge(&mut self, edge: Edge, at_ms: u64) -> bool {
        if edge == Edge::Falling {
            return false;
        }
        let bouncing = self
            .last_accepted_ms
            .is_some_and(|last| at_ms.saturating_sub(last) < self.debounce_ms);
        if bouncing {
            return false;
        }
        self.last_accepted_ms = Some(at_ms);
        true
    }
}
