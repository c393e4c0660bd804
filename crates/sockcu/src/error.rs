//! Error types for sockcu.
//!
//! Every failure that can end the program maps onto a sysexits(3)-style
//! exit status so scripts can tell a bad invocation from a dead socket.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Successful termination.
pub const EX_OK: i32 = 0;
/// Command line usage error.
pub const EX_USAGE: i32 = 64;
/// Input data was incorrect (socket path does not fit).
pub const EX_DATAERR: i32 = 65;
/// Service unavailable (cannot connect to the socket).
pub const EX_UNAVAILABLE: i32 = 69;
/// Operating system error.
pub const EX_OSERR: i32 = 71;
/// Cannot create the output file.
pub const EX_CANTCREAT: i32 = 73;
/// Input/output error.
pub const EX_IOERR: i32 = 74;
/// Configuration error.
pub const EX_CONFIG: i32 = 78;

/// One of the four handles a session moves bytes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The terminal's standard input.
    LocalInput,
    /// The terminal's standard output.
    LocalOutput,
    /// Bytes arriving from the socket.
    RemoteInput,
    /// Bytes going to the socket.
    RemoteOutput,
    /// The traffic log file.
    Log,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Endpoint::LocalInput => "read(stdin)",
            Endpoint::LocalOutput => "write(stdout)",
            Endpoint::RemoteInput => "read(socket)",
            Endpoint::RemoteOutput => "write(socket)",
            Endpoint::Log => "write(log)",
        };
        f.write_str(name)
    }
}

/// Errors that end a sockcu run.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The traffic log could not be opened for appending.
    #[error("open({}): {source}", path.display())]
    LogFile {
        /// Path given for the traffic log.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The socket path is longer than a `sockaddr_un` can hold.
    #[error("{}: name too long ({len} bytes, max {max})", path.display())]
    PathTooLong {
        /// Offending socket path.
        path: PathBuf,
        /// Length of the path in bytes.
        len: usize,
        /// Largest path the platform accepts.
        max: usize,
    },

    /// The configuration file or overrides were invalid.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// Terminal attributes could not be read or applied.
    #[error("{op}: {source}")]
    TerminalConfig {
        /// The failing termios call.
        op: &'static str,
        /// Underlying error.
        source: nix::Error,
    },

    /// The socket could not be connected.
    #[error("connect({}): {source}", path.display())]
    Connect {
        /// Socket path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A read or write failed while relaying.
    #[error("{endpoint}: {source}")]
    Io {
        /// Handle the failure happened on.
        endpoint: Endpoint,
        /// Underlying error.
        source: io::Error,
    },

    /// Signal listeners could not be installed.
    #[error("signal handler: {0}")]
    Signal(io::Error),

    /// The async runtime could not be started.
    #[error("runtime: {0}")]
    Runtime(io::Error),
}

impl RelayError {
    /// Build an I/O error for the given endpoint.
    pub fn io(endpoint: Endpoint, source: io::Error) -> Self {
        RelayError::Io { endpoint, source }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::LogFile { .. } => EX_CANTCREAT,
            RelayError::PathTooLong { .. } => EX_DATAERR,
            RelayError::Config(_) => EX_CONFIG,
            RelayError::TerminalConfig { .. } => EX_IOERR,
            RelayError::Connect { .. } => EX_UNAVAILABLE,
            RelayError::Io { .. } => EX_IOERR,
            RelayError::Signal(_) | RelayError::Runtime(_) => EX_OSERR,
        }
    }
}

/// Result type alias using [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn io_err() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "boom")
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(
            RelayError::LogFile {
                path: "/nope/log".into(),
                source: io_err()
            }
            .exit_code(),
            EX_CANTCREAT
        );
        assert_eq!(
            RelayError::Connect {
                path: "/tmp/x.sock".into(),
                source: io_err()
            }
            .exit_code(),
            EX_UNAVAILABLE
        );
        assert_eq!(
            RelayError::TerminalConfig {
                op: "tcgetattr",
                source: nix::Error::ENOTTY
            }
            .exit_code(),
            EX_IOERR
        );
        assert_eq!(
            RelayError::io(Endpoint::RemoteInput, io_err()).exit_code(),
            EX_IOERR
        );
    }

    #[test]
    fn test_pre_session_failures_are_distinguishable() {
        let codes: HashSet<i32> = [
            EX_USAGE,
            RelayError::LogFile {
                path: PathBuf::new(),
                source: io_err(),
            }
            .exit_code(),
            RelayError::Connect {
                path: PathBuf::new(),
                source: io_err(),
            }
            .exit_code(),
        ]
        .into_iter()
        .collect();

        assert_eq!(codes.len(), 3);
        assert!(!codes.contains(&EX_OK));
    }

    #[test]
    fn test_display_names_endpoint() {
        let err = RelayError::io(Endpoint::RemoteOutput, io_err());
        assert_eq!(err.to_string(), "write(socket): boom");

        let err = RelayError::io(Endpoint::LocalInput, io_err());
        assert_eq!(err.to_string(), "read(stdin): boom");
    }

    #[test]
    fn test_display_path_too_long() {
        let err = RelayError::PathTooLong {
            path: PathBuf::from("/very/long"),
            len: 200,
            max: 108,
        };
        assert_eq!(
            err.to_string(),
            "/very/long: name too long (200 bytes, max 108)"
        );
        assert_eq!(err.exit_code(), EX_DATAERR);
    }
}
