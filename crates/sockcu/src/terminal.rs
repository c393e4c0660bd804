//! Raw mode for the controlling terminal.
//!
//! [`RawMode`] is a scoped acquisition: entering raw mode snapshots the
//! terminal attributes, and the snapshot is written back exactly once, either
//! by an explicit [`RawMode::restore`] or when the guard is dropped on an
//! error path or during unwinding.

use std::os::fd::AsFd;

use nix::sys::termios::{cfmakeraw, tcgetattr, tcsetattr, SetArg, Termios};
use tracing::{debug, warn};

use crate::error::{RelayError, Result};

/// Guard that keeps a terminal in raw mode while it is alive.
pub struct RawMode<F: AsFd> {
    fd: F,
    /// Attributes captured before raw mode; `None` once restored.
    saved: Option<Termios>,
}

impl<F: AsFd> RawMode<F> {
    /// Switch `fd` to raw mode: no line buffering, no echo, no special
    /// character processing, one byte at a time.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TerminalConfig`] if the attributes cannot be read
    /// or applied. On failure nothing is left to restore.
    pub fn enter(fd: F) -> Result<Self> {
        let saved = tcgetattr(&fd).map_err(|source| RelayError::TerminalConfig {
            op: "tcgetattr",
            source,
        })?;

        let mut raw = saved.clone();
        cfmakeraw(&mut raw);
        tcsetattr(&fd, SetArg::TCSANOW, &raw).map_err(|source| RelayError::TerminalConfig {
            op: "tcsetattr",
            source,
        })?;

        debug!("Terminal switched to raw mode");

        Ok(Self {
            fd,
            saved: Some(saved),
        })
    }

    /// The attributes that will be restored.
    pub fn saved(&self) -> Option<&Termios> {
        self.saved.as_ref()
    }

    /// Put the original attributes back.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TerminalConfig`] if `tcsetattr` fails. The
    /// snapshot is consumed either way, so the drop handler will not retry.
    pub fn restore(mut self) -> Result<()> {
        self.restore_saved()
    }

    fn restore_saved(&mut self) -> Result<()> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };

        tcsetattr(&self.fd, SetArg::TCSANOW, &saved).map_err(|source| {
            RelayError::TerminalConfig {
                op: "tcsetattr",
                source,
            }
        })?;

        debug!("Terminal attributes restored");
        Ok(())
    }
}

impl<F: AsFd> Drop for RawMode<F> {
    fn drop(&mut self) {
        // The process is on its way out; a failed restore is only reported.
        if let Err(e) = self.restore_saved() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}
