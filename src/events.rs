//! Trigger events and the single-consumer trigger queue.
//!
//! Events are produced by:
//! - the motion-sensor edge watcher (one per accepted rising edge)
//! - the startup check (one forced event at boot)
//!
//! and consumed by one worker that runs capture sessions back to back.
//!
//! ```text
//! ┌─────────────┐ offer  ┌──────────────┐  run   ┌──────────────┐
//! │ Edge thread │───────▶│ cap-1 chan + │───────▶│ Worker loop  │
//! │ Startup     │───────▶│  busy flag   │        │ (consumer)   │
//! └─────────────┘        └──────────────┘        └──────────────┘
//! ```
//!
//! The producer never blocks.  While a session runs, or while one event
//! is already pending, new events are dropped: at most one capture
//! session is ever active and triggers are never queued behind it.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use log::debug;

use crate::lifecycle::ShutdownListener;

/// One request to run a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Monotonic time of the edge (or of the startup check).
    pub timestamp: Duration,
    /// GPIO line that fired.
    pub channel: u32,
    /// Skip the sensor-level gate.
    pub forced: bool,
}

impl TriggerEvent {
    /// A rising edge on `channel`.
    pub fn edge(channel: u32, timestamp: Duration) -> Self {
        Self {
            timestamp,
            channel,
            forced: false,
        }
    }

    /// The startup check: captures regardless of the sensor level.
    pub fn forced(channel: u32, timestamp: Duration) -> Self {
        Self {
            timestamp,
            channel,
            forced: true,
        }
    }
}

/// Build a connected producer/consumer pair.
pub fn trigger_queue() -> (TriggerProducer, TriggerConsumer) {
    let (tx, rx) = bounded(1);
    let busy = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicU32::new(0));
    (
        TriggerProducer {
            tx,
            busy: Arc::clone(&busy),
            dropped: Arc::clone(&dropped),
        },
        TriggerConsumer { rx, busy, dropped },
    )
}

// ── Producer ──────────────────────────────────────────────────

/// Non-blocking sending half, cheap to clone into callbacks.
#[derive(Clone)]
pub struct TriggerProducer {
    tx: Sender<TriggerEvent>,
    busy: Arc<AtomicBool>,
    dropped: Arc<AtomicU32>,
}

impl TriggerProducer {
    /// Offer an event to the worker.
    /// Returns `false` if it was dropped (session running or one pending).
    pub fn offer(&self, event: TriggerEvent) -> bool {
        if self.busy.load(Ordering::Acquire) {
            self.note_drop(event, "session in progress");
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(ev)) => {
                self.note_drop(ev, "trigger already pending");
                false
            }
            Err(TrySendError::Disconnected(ev)) => {
                self.note_drop(ev, "worker gone");
                false
            }
        }
    }

    fn note_drop(&self, event: TriggerEvent, why: &str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        debug!("Trigger on line {} dropped: {}", event.channel, why);
    }
}

// ── Consumer ──────────────────────────────────────────────────

/// Receiving half, owned by the single worker.
pub struct TriggerConsumer {
    rx: Receiver<TriggerEvent>,
    busy: Arc<AtomicBool>,
    dropped: Arc<AtomicU32>,
}

impl TriggerConsumer {
    /// Run `handler` for every accepted trigger until shutdown.
    ///
    /// Anything that slipped into the channel while `handler` was running
    /// is discarded afterwards.
    pub fn run(&self, shutdown: &ShutdownListener, mut handler: impl FnMut(TriggerEvent)) {
        loop {
            let event = select! {
                recv(self.rx) -> msg => match msg {
                    Ok(ev) => ev,
                    Err(_) => return,
                },
                recv(shutdown.receiver()) -> _ => return,
            };
            if shutdown.is_requested() {
                return;
            }

            self.busy.store(true, Ordering::Release);
            handler(event);
            let stale = self.rx.try_iter().count();
            if stale > 0 {
                debug!("Discarded {} trigger(s) raised during the session", stale);
            }
            self.busy.store(false, Ordering::Release);
        }
    }

    /// `true` while a handler is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Number of events dropped by producers since start.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
