//! Power/link controller: dial-up session establishment and teardown.
//!
//! ```text
//!   connect()                         disconnect()
//!   ─────────                         ────────────
//!   spawn dial-up process             kill process     (errors ignored)
//!   poll rx counter, 1 Hz ──┐         remove lock file (errors ignored)
//!     > 0  → connected      │
//!     timeout → not         │
//!   ◀──────────────────────-┘
//! ```
//!
//! There is no retry or backoff inside the polling window: one timeout
//! fails the link for the current session.

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::ports::{Clock, LinkPort};
use crate::config::ModemConfig;
use crate::error::LinkError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// State of the dial-up session.
///
/// While `connected` is true the transport interface exists and has
/// received at least one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSession {
    pub connected: bool,
    /// The dial-up process was spawned and has not been torn down.
    pub process_running: bool,
}

pub struct LinkController<L, C> {
    link: L,
    clock: C,
    interface: String,
    timeout_secs: u32,
    session: LinkSession,
}

impl<L: LinkPort, C: Clock> LinkController<L, C> {
    pub fn new(link: L, clock: C, config: &ModemConfig) -> Self {
        Self {
            link,
            clock,
            interface: config.interface.clone(),
            timeout_secs: config.ppp_timeout,
            session: LinkSession::default(),
        }
    }

    /// Spawn the dial-up process and wait for traffic.
    ///
    /// Returns `true` once the received-byte counter is non-zero, `false`
    /// on spawn failure, timeout or shutdown.
    pub fn connect(&mut self) -> bool {
        if self.session.connected {
            return true;
        }
        if let Err(e) = self.link.spawn_session() {
            error!("LINK: {e}");
            return false;
        }
        self.session.process_running = true;

        let mut waited = 0;
        loop {
            if self.link.rx_bytes().is_some_and(|rx| rx > 0) {
                self.session.connected = true;
                info!("LINK: up after {waited}s");
                return true;
            }
            if waited >= self.timeout_secs {
                break;
            }
            if self.clock.sleep(POLL_INTERVAL).is_err() {
                warn!("LINK: connect interrupted by shutdown");
                return false;
            }
            waited += 1;
        }

        error!(
            "LINK: {}",
            LinkError::Timeout {
                interface: self.interface.clone(),
                secs: self.timeout_secs,
            }
        );
        false
    }

    /// Kill the session and remove its lock.  Never fails; the link may
    /// already be down.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.link.kill_session() {
            debug!("LINK: kill: {e}");
        }
        if let Err(e) = self.link.remove_lock() {
            debug!("LINK: lock: {e}");
        }
        if self.session.process_running {
            info!("LINK: down");
        }
        self.session = LinkSession::default();
    }

    pub fn session(&self) -> LinkSession {
        self.session
    }

    pub fn port(&self) -> &L {
        &self.link
    }
}
