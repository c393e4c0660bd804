//! A single relay session.
//!
//! The loop waits on local input, remote input and the shutdown future at
//! once and acts on exactly one of them per wake-up, always in the order
//! shutdown, local, remote. Output handles are written without waiting for
//! readiness. The loop ends on the escape sequence, end of stream on either
//! input, a shutdown signal, or the first I/O error.

use std::fmt;
use std::future::Future;
use std::io;

use escape::EscapeDetector;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::capture::TrafficLog;
use crate::config::DEFAULT_BUFFER_SIZE;
use crate::error::{Endpoint, RelayError, Result};

/// Why a session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The user typed `CR ~ .`.
    EscapeSequence,
    /// Local input reached end of stream.
    LocalClosed,
    /// The remote end closed the connection.
    RemoteClosed,
    /// A termination signal arrived.
    Signal(&'static str),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::EscapeSequence => f.write_str("disconnected"),
            Termination::LocalClosed => f.write_str("stdin: end of input"),
            Termination::RemoteClosed => f.write_str("socket: closed by remote"),
            Termination::Signal(name) => write!(f, "terminated by {}", name),
        }
    }
}

/// Byte counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Bytes written to the remote end.
    pub bytes_to_remote: u64,
    /// Bytes written to local output.
    pub bytes_to_local: u64,
    /// Bytes appended to the traffic log.
    pub bytes_logged: u64,
}

enum Event {
    Shutdown(&'static str),
    Local(io::Result<usize>),
    Remote(io::Result<usize>),
}

/// Bidirectional relay between a terminal and a remote stream.
pub struct Session<LI, LO, RI, RO> {
    local_in: LI,
    local_out: LO,
    remote_in: RI,
    remote_out: RO,
    log: Option<TrafficLog>,
    detector: EscapeDetector,
    buffer_size: usize,
    stats: SessionStats,
}

impl<LI, LO, RI, RO> Session<LI, LO, RI, RO>
where
    LI: AsyncRead + Unpin,
    LO: AsyncWrite + Unpin,
    RI: AsyncRead + Unpin,
    RO: AsyncWrite + Unpin,
{
    /// Create a session over the four handles.
    ///
    /// Remote input and output are usually the two halves of one stream.
    pub fn new(local_in: LI, local_out: LO, remote_in: RI, remote_out: RO) -> Self {
        Self {
            local_in,
            local_out,
            remote_in,
            remote_out,
            log: None,
            detector: EscapeDetector::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            stats: SessionStats::default(),
        }
    }

    /// Capture remote traffic into `log`.
    pub fn with_log(mut self, log: TrafficLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Use a custom escape detector.
    pub fn with_detector(mut self, detector: EscapeDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Read at most `size` bytes per wake-up from each input.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Relay until the session terminates.
    ///
    /// `shutdown` resolves to a signal name when the session should end from
    /// outside; pass [`std::future::pending`] to disable it.
    ///
    /// # Errors
    ///
    /// Any read or write failure ends the session with [`RelayError::Io`].
    /// Nothing is retried. A broken pipe or connection reset on the remote
    /// stream counts as the remote closing.
    pub async fn run<S>(&mut self, shutdown: S) -> Result<Termination>
    where
        S: Future<Output = &'static str>,
    {
        tokio::pin!(shutdown);

        let mut local_buf = vec![0u8; self.buffer_size];
        let mut remote_buf = vec![0u8; self.buffer_size];

        info!(
            "Session started (escape: CR {:?} .)",
            self.detector.escape_char() as char
        );

        let termination = loop {
            let event = tokio::select! {
                biased;
                name = &mut shutdown => Event::Shutdown(name),
                read = self.local_in.read(&mut local_buf) => Event::Local(read),
                read = self.remote_in.read(&mut remote_buf) => Event::Remote(read),
            };

            match event {
                Event::Shutdown(name) => break Termination::Signal(name),
                Event::Local(Ok(0)) => break Termination::LocalClosed,
                Event::Local(Ok(n)) => {
                    if let Some(ended) = self.forward_local(&local_buf[..n]).await? {
                        break ended;
                    }
                }
                Event::Local(Err(e)) => return Err(RelayError::io(Endpoint::LocalInput, e)),
                Event::Remote(Ok(0)) => break Termination::RemoteClosed,
                Event::Remote(Ok(n)) => self.deliver_remote(&remote_buf[..n]).await?,
                Event::Remote(Err(e)) if is_hangup(&e) => break Termination::RemoteClosed,
                Event::Remote(Err(e)) => return Err(RelayError::io(Endpoint::RemoteInput, e)),
            }
        };

        info!(
            to_remote = self.stats.bytes_to_remote,
            to_local = self.stats.bytes_to_local,
            logged = self.stats.bytes_logged,
            "Session ended: {}",
            termination
        );

        Ok(termination)
    }

    /// Send typed bytes to the remote end.
    ///
    /// Returns a termination when the escape sequence completed inside
    /// `chunk` or the remote end has already hung up.
    async fn forward_local(&mut self, chunk: &[u8]) -> Result<Option<Termination>> {
        let scan = self.detector.scan(chunk);
        let outgoing = &chunk[..scan.forward_len];

        debug!(
            read = chunk.len(),
            forward = outgoing.len(),
            state = ?self.detector.state(),
            "local input"
        );

        if !outgoing.is_empty() {
            let sent = match self.remote_out.write_all(outgoing).await {
                Ok(()) => self.remote_out.flush().await,
                Err(e) => Err(e),
            };
            match sent {
                Ok(()) => self.stats.bytes_to_remote += outgoing.len() as u64,
                Err(e) if is_hangup(&e) => {
                    debug!("remote hung up with {} bytes unsent: {}", outgoing.len(), e);
                    return Ok(Some(Termination::RemoteClosed));
                }
                Err(e) => return Err(RelayError::io(Endpoint::RemoteOutput, e)),
            }
        }

        Ok(scan.terminated.then_some(Termination::EscapeSequence))
    }

    /// Log and display bytes received from the remote end.
    async fn deliver_remote(&mut self, chunk: &[u8]) -> Result<()> {
        debug!(read = chunk.len(), "remote input");

        if let Some(log) = self.log.as_mut() {
            log.append(chunk)
                .await
                .map_err(|e| RelayError::io(Endpoint::Log, e))?;
            self.stats.bytes_logged += chunk.len() as u64;
        }

        let io_err = |e| RelayError::io(Endpoint::LocalOutput, e);
        self.local_out.write_all(chunk).await.map_err(io_err)?;
        self.local_out.flush().await.map_err(io_err)?;
        self.stats.bytes_to_local += chunk.len() as u64;

        Ok(())
    }
}

/// The peer closed its end of the connection.
fn is_hangup(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
    )
}
