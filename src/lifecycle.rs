//! Process lifecycle: shutdown fan-out, signal handling, teardown.
//!
//! ## Shutdown lifecycle
//!
//! 1. A termination signal (SIGINT, SIGTERM, SIGHUP) arrives on the
//!    signal thread, which calls [`ShutdownTrigger::request`].
//! 2. The request drops the only sender of the shutdown channel.  Every
//!    [`ShutdownListener`] sees the disconnect at once, so every blocking
//!    wait in the system (recording loop, link poll, throttle delay,
//!    telemetry sampling, the idle worker) wakes up.
//! 3. The interrupted session unwinds through its own teardown and the
//!    worker loop returns.
//! 4. `main` runs [`teardown`] over the whole hardware set and exits 0.
//!
//! Teardown is idempotent: every step tolerates the resource already
//! being released, so a signal arriving during cleanup is harmless.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use log::info;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::app::ports::{CaptureHardware, NotifyPort};

// ── Shutdown token ────────────────────────────────────────────

/// Build a connected trigger/listener pair.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownListener) {
    let (tx, rx) = bounded(0);
    (
        ShutdownTrigger {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        ShutdownListener { rx },
    )
}

/// Requests shutdown.  Clone freely; the first request wins.
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl ShutdownTrigger {
    pub fn request(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            info!("Shutdown requested");
        }
    }
}

/// Observes shutdown.  Never receives a message: the channel only ever
/// disconnects.
#[derive(Clone)]
pub struct ShutdownListener {
    rx: Receiver<()>,
}

impl ShutdownListener {
    pub fn is_requested(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block for up to `timeout`.  Returns `true` if shutdown was
    /// requested before or during the wait.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        !matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    /// For `select!` alongside other channels.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

// ── Signals ───────────────────────────────────────────────────

/// Spawn the thread that turns termination signals into a shutdown
/// request.  The thread exits after the first signal.
pub fn spawn_signal_thread(trigger: ShutdownTrigger) -> io::Result<JoinHandle<()>> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {sig}, exiting...");
                trigger.request();
            }
        })
}

// ── Teardown ──────────────────────────────────────────────────

/// Put every output into its safe state: illumination off, recording
/// stopped, camera released, link down, modem off.
pub fn teardown(hw: &mut impl CaptureHardware, notifier: &mut impl NotifyPort) {
    hw.release();
    notifier.shutdown();
    info!("Teardown complete");
}
