//! # sockcu
//!
//! A `cu`-style console client for Unix domain stream sockets. sockcu puts
//! the terminal into raw mode and relays bytes between it and a socket until
//! the user types `CR ~ .`, either side closes, or a termination signal
//! arrives.
//!
//! ## Architecture
//!
//! ```text
//!   stdin ──▶ EscapeDetector ──▶ socket
//!   stdout ◀──────────────┬───── socket
//!                         └────▶ TrafficLog (optional)
//! ```
//!
//! The terminal is held in raw mode by a [`RawMode`] guard that restores the
//! saved attributes on every exit path.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use sockcu::{Connection, RawMode, Session};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> sockcu::Result<()> {
//!     let connection = Connection::connect(Path::new("/run/vm/console.sock")).await?;
//!     let raw = RawMode::enter(std::io::stdin())?;
//!
//!     let (remote_in, remote_out) = connection.into_split();
//!     let mut session = Session::new(tokio::io::stdin(), tokio::io::stdout(), remote_in, remote_out);
//!     let ended = session.run(std::future::pending()).await?;
//!
//!     raw.restore()?;
//!     eprintln!("[{}]", ended);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`connection`]: Unix socket connection
//! - [`error`]: Error taxonomy and exit codes
//! - [`relay`]: The relay loop and traffic log
//! - [`signals`]: Termination signal listeners
//! - [`terminal`]: Raw mode guard

pub mod config;
pub mod connection;
pub mod error;
pub mod relay;
pub mod signals;
pub mod terminal;

// Re-export the escape crate for convenience
pub use escape;

pub use config::{Config, ConfigError};
pub use connection::Connection;
pub use error::{Endpoint, RelayError, Result};
pub use relay::{Session, SessionStats, Termination, TrafficLog};
pub use signals::ShutdownSignals;
pub use terminal::RawMode;
