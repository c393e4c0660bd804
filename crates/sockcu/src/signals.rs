//! Termination signals observed during a session.
//!
//! In raw mode `^C` is delivered to the remote side as a byte, so SIGINT only
//! arrives from `kill`. SIGTERM, SIGHUP and SIGINT all end the session through
//! the normal path, which lets the terminal guard restore the original mode.

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::info;

use crate::error::{RelayError, Result};

/// Listeners for the signals that end a session.
pub struct ShutdownSignals {
    terminate: Signal,
    hangup: Signal,
    interrupt: Signal,
}

impl ShutdownSignals {
    /// Register the listeners.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Signal`] if a handler cannot be registered.
    pub fn install() -> Result<Self> {
        let listen = |kind| signal(kind).map_err(RelayError::Signal);

        Ok(Self {
            terminate: listen(SignalKind::terminate())?,
            hangup: listen(SignalKind::hangup())?,
            interrupt: listen(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next termination signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.hangup.recv() => "SIGHUP",
            _ = self.interrupt.recv() => "SIGINT",
        };

        info!("Received {}, ending session", name);
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::{raise, Signal as NixSignal};
    use serial_test::serial;
    use std::time::Duration;

    #[tokio::test]
    #[serial]
    async fn test_install() {
        assert!(ShutdownSignals::install().is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_recv_reports_hangup() {
        let mut signals = ShutdownSignals::install().unwrap();

        raise(NixSignal::SIGHUP).unwrap();

        let name = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap();
        assert_eq!(name, "SIGHUP");
    }

    #[tokio::test]
    #[serial]
    async fn test_recv_reports_terminate() {
        let mut signals = ShutdownSignals::install().unwrap();

        raise(NixSignal::SIGTERM).unwrap();

        let name = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap();
        assert_eq!(name, "SIGTERM");
    }
}
