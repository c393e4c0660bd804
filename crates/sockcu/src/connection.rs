//! Unix domain socket connection for the remote side of a session.
//!
//! The remote console is any process listening on a `SOCK_STREAM` Unix
//! socket: a VM serial port exported by a hypervisor, a container console,
//! a `socat` bridge. The connected stream is split into a read half (remote
//! input) and a write half (remote output) for the relay.

use std::path::Path;

use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// Size of `sockaddr_un.sun_path` on this platform.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const SUN_PATH_CAPACITY: usize = 108;

/// Size of `sockaddr_un.sun_path` on this platform.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const SUN_PATH_CAPACITY: usize = 104;

/// A connected socket, ready to be handed to a relay session.
#[derive(Debug)]
pub struct Connection {
    stream: UnixStream,
}

impl Connection {
    /// Connect to the stream socket at `path`.
    ///
    /// # Errors
    ///
    /// - [`RelayError::PathTooLong`] if the path cannot fit in a
    ///   `sockaddr_un` together with its terminating NUL.
    /// - [`RelayError::Connect`] if nothing accepts the connection.
    pub async fn connect(path: &Path) -> Result<Self> {
        check_path_len(path)?;

        debug!("Connecting to {:?}", path);
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| RelayError::Connect {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Connected to {}", path.display());

        Ok(Self { stream })
    }

    /// Split into remote input and remote output halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }
}

/// Reject socket paths that cannot be addressed.
pub fn check_path_len(path: &Path) -> Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let len = path.as_os_str().as_bytes().len();
    // One byte is reserved for the NUL terminator.
    let max = SUN_PATH_CAPACITY - 1;

    if len > max {
        return Err(RelayError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max,
        });
    }

    Ok(())
}
