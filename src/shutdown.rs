//! Signal handling for graceful shutdown.
//!
//! Both binaries stop cleanly on SIGINT and SIGTERM so the shared region and the
//! socket are released by drop.

use std::fmt;

use tokio::signal::unix::{Signal, SignalKind, signal};

use crate::{BridgeError, Result};

/// Which signal asked the process to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
        })
    }
}

/// SIGINT and SIGTERM listeners, installed up front so a failure surfaces at startup.
#[derive(Debug)]
pub struct ShutdownSignal {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignal {
    /// Installs both handlers. Must be called inside a tokio runtime.
    pub fn install() -> Result<Self> {
        let interrupt = signal(SignalKind::interrupt())
            .map_err(|source| BridgeError::Signal { signal: "SIGINT", source })?;
        let terminate = signal(SignalKind::terminate())
            .map_err(|source| BridgeError::Signal { signal: "SIGTERM", source })?;
        Ok(Self { interrupt, terminate })
    }

    /// Waits for the next SIGINT or SIGTERM.
    pub async fn recv(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownReason::Interrupt,
            _ = self.terminate.recv() => ShutdownReason::Terminate,
        }
    }
}
