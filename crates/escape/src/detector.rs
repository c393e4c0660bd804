//! Escape sequence state machine.
//!
//! The detector only ever sees bytes typed on the local terminal. It never
//! suppresses a byte that might still turn out to be ordinary input: the
//! `CR` and escape character are forwarded as they arrive, and the session
//! ends on the terminating `.`.

use crate::error::{EscapeError, Result};

/// First byte of the escape sequence (carriage return).
pub const TRIGGER: u8 = b'\r';

/// Default escape character, the middle byte of the sequence.
pub const DEFAULT_ESCAPE_CHAR: u8 = b'~';

/// Last byte of the escape sequence. Seeing it completes the sequence.
pub const TERMINATOR: u8 = b'.';

/// Progress toward the escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeState {
    /// No prefix of the sequence has been seen.
    #[default]
    Begin,
    /// The previous byte was a carriage return.
    SawCR,
    /// A carriage return followed by the escape character.
    SawTilde,
}

/// Outcome of feeding one byte to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State after consuming the byte.
    pub next: EscapeState,
    /// Whether the byte goes out to the remote end.
    pub forward: bool,
    /// Whether the byte completed the escape sequence.
    pub terminate: bool,
}

impl Transition {
    #[inline]
    fn forward(next: EscapeState) -> Self {
        Self {
            next,
            forward: true,
            terminate: false,
        }
    }

    #[inline]
    fn terminate() -> Self {
        Self {
            next: EscapeState::Begin,
            forward: false,
            terminate: true,
        }
    }
}

/// Result of scanning a chunk of local input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    /// Length of the chunk prefix that must be forwarded.
    pub forward_len: usize,
    /// Whether the escape sequence completed inside the chunk.
    ///
    /// When set, `chunk[forward_len]` is the terminating `.` and nothing from
    /// that index on is forwarded.
    pub terminated: bool,
}

/// Pure transition function for the default `CR ~ .` sequence.
#[inline]
pub fn step(state: EscapeState, byte: u8) -> Transition {
    step_with(state, byte, DEFAULT_ESCAPE_CHAR)
}

/// Pure transition function with an arbitrary escape character.
pub fn step_with(state: EscapeState, byte: u8, escape_char: u8) -> Transition {
    match state {
        EscapeState::Begin if byte == TRIGGER => Transition::forward(EscapeState::SawCR),
        EscapeState::Begin => Transition::forward(EscapeState::Begin),
        EscapeState::SawCR if byte == escape_char => Transition::forward(EscapeState::SawTilde),
        EscapeState::SawCR if byte == TRIGGER => Transition::forward(EscapeState::SawCR),
        EscapeState::SawCR => Transition::forward(EscapeState::Begin),
        EscapeState::SawTilde if byte == TERMINATOR => Transition::terminate(),
        // A CR here does not restart the sequence, it only resets it.
        EscapeState::SawTilde => Transition::forward(EscapeState::Begin),
    }
}

/// Stateful escape detector for one direction of one session.
#[derive(Debug, Clone)]
pub struct EscapeDetector {
    state: EscapeState,
    escape_char: u8,
}

impl Default for EscapeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EscapeDetector {
    /// Create a detector for the `CR ~ .` sequence.
    pub fn new() -> Self {
        Self {
            state: EscapeState::Begin,
            escape_char: DEFAULT_ESCAPE_CHAR,
        }
    }

    /// Create a detector whose middle byte is `escape_char`.
    ///
    /// # Errors
    ///
    /// The escape character must be printable ASCII and must not be `.`.
    pub fn with_escape_char(escape_char: u8) -> Result<Self> {
        if !escape_char.is_ascii_graphic() {
            return Err(EscapeError::NotPrintable(escape_char));
        }
        if escape_char == TERMINATOR {
            return Err(EscapeError::CollidesWithTerminator);
        }

        Ok(Self {
            state: EscapeState::Begin,
            escape_char,
        })
    }

    /// The configured escape character.
    #[inline]
    pub fn escape_char(&self) -> u8 {
        self.escape_char
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> EscapeState {
        self.state
    }

    /// Return to [`EscapeState::Begin`].
    #[inline]
    pub fn reset(&mut self) {
        self.state = EscapeState::Begin;
    }

    /// Consume one byte and advance the state.
    #[inline]
    pub fn feed(&mut self, byte: u8) -> Transition {
        let transition = step_with(self.state, byte, self.escape_char);
        self.state = transition.next;
        transition
    }

    /// Run a whole chunk through the detector.
    ///
    /// Stops at the terminating byte; bytes after it are not examined and the
    /// detector is left in [`EscapeState::Begin`].
    pub fn scan(&mut self, chunk: &[u8]) -> Scan {
        for (index, &byte) in chunk.iter().enumerate() {
            if self.feed(byte).terminate {
                return Scan {
                    forward_len: index,
                    terminated: true,
                };
            }
        }

        Scan {
            forward_len: chunk.len(),
            terminated: false,
        }
    }
}
