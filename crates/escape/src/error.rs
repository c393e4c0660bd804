//! Error types for the escape crate.

use thiserror::Error;

/// Errors produced when configuring an escape detector.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EscapeError {
    /// The escape character is not a printable ASCII character.
    #[error("escape character must be printable ASCII, got {0:#04x}")]
    NotPrintable(u8),

    /// The escape character collides with the terminating byte.
    #[error("escape character cannot be '.', it already ends the sequence")]
    CollidesWithTerminator,
}

/// Result type alias using [`EscapeError`].
pub type Result<T> = std::result::Result<T, EscapeError>;
