//! # Escape Sequence Detection
//!
//! This crate holds the I/O-free state machine that watches the bytes a user
//! types into a sockcu session and decides when the session should end.
//!
//! ## Overview
//!
//! The reserved sequence is `CR`, `~`, `.` (the `~` is configurable). Every
//! byte is forwarded to the remote end as it is typed, including the `CR` and
//! `~` of a candidate sequence; only the final `.` and whatever follows it in
//! the same chunk are withheld.
//!
//! ```text
//!            '\r'              '~'               '.'
//!  Begin ──────────▶ SawCR ──────────▶ SawTilde ──────────▶ terminate
//!    ▲  ◀────────────  │ ◀─┐              │
//!    │     other       └───┘ '\r'         │
//!    └────────────────────────────────────┘
//!                     other
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use escape::EscapeDetector;
//!
//! let mut detector = EscapeDetector::new();
//!
//! let scan = detector.scan(b"AB\r~.C");
//! assert!(scan.terminated);
//! assert_eq!(scan.forward_len, 4); // "AB\r~" goes out, ".C" does not
//! ```
//!
//! ## Modules
//!
//! - [`detector`]: The transition function and the stateful detector
//! - [`error`]: Error types

pub mod detector;
pub mod error;

pub use detector::{
    step, step_with, EscapeDetector, EscapeState, Scan, Transition, DEFAULT_ESCAPE_CHAR,
    TERMINATOR, TRIGGER,
};
pub use error::{EscapeError, Result};
