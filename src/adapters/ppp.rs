//! Dial-up link adapter: `pon`/`pppd` child process and the `ppp0`
//! received-byte counter.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use log::debug;
use sysinfo::Networks;

use crate::app::ports::LinkPort;
use crate::config::ModemConfig;
use crate::error::LinkError;

pub struct PppLink {
    command: String,
    lock_file: PathBuf,
    interface: String,
    child: Option<Child>,
    networks: Networks,
}

impl PppLink {
    pub fn new(config: &ModemConfig) -> Self {
        Self {
            command: config.ppp_call_command.clone(),
            lock_file: config.lock_file.clone(),
            interface: config.interface.clone(),
            child: None,
            networks: Networks::new(),
        }
    }
}

/// Program and arguments of the call command, split on whitespace.
fn split_command(command: &str) -> Result<(&str, Vec<&str>), LinkError> {
    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(LinkError::EmptyCommand)?;
    Ok((program, parts.collect()))
}

impl LinkPort for PppLink {
    fn spawn_session(&mut self) -> Result<(), LinkError> {
        let (program, args) = split_command(&self.command)?;
        debug!("LINK: spawning {}", self.command);
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(LinkError::Spawn)?;
        self.child = Some(child);
        Ok(())
    }

    fn rx_bytes(&mut self) -> Option<u64> {
        self.networks.refresh(true);
        self.networks
            .iter()
            .find(|(name, _)| name.as_str() == self.interface)
            .map(|(_, data)| data.total_received())
    }

    fn kill_session(&mut self) -> Result<(), LinkError> {
        let mut child = self.child.take().ok_or(LinkError::NoSession)?;
        match child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(e) if e.kind() == ErrorKind::InvalidInput => {}
            Err(e) => return Err(LinkError::Kill(e)),
        }
        child.wait().map_err(LinkError::Kill)?;
        Ok(())
    }

    fn remove_lock(&mut self) -> Result<(), LinkError> {
        std::fs::remove_file(&self.lock_file).map_err(|source| LinkError::LockFile {
            path: self.lock_file.clone(),
            source,
        })
    }
}
