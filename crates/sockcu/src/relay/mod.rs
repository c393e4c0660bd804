//! The relay loop between the local terminal and the remote socket.
//!
//! A [`Session`] owns four handles (local input and output, remote input and
//! output), an escape detector for the local input, and an optional
//! [`TrafficLog`] that captures everything the remote side sends.

mod capture;
mod session;

pub use capture::TrafficLog;
pub use session::{Session, SessionStats, Termination};
