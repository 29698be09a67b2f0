//! System clock adapter.
//!
//! Monotonic uptime from `std::time::Instant`, wall-clock time from
//! `chrono::Local`, and a sleep that wakes early when shutdown is
//! requested so every blocking point in a session is cancellable.

use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use crate::app::ports::Clock;
use crate::error::Interrupted;
use crate::lifecycle::ShutdownListener;

#[derive(Clone)]
pub struct SystemClock {
    start: Instant,
    shutdown: ShutdownListener,
}

impl SystemClock {
    pub fn new(shutdown: ShutdownListener) -> Self {
        Self {
            start: Instant::now(),
            shutdown,
        }
    }

    /// Origin of [`Clock::uptime`], for adapters that timestamp on their
    /// own threads.
    pub fn epoch(&self) -> Instant {
        self.start
    }
}

impl Clock for SystemClock {
    fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    fn now_local(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.shutdown.wait_timeout(duration) {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}
