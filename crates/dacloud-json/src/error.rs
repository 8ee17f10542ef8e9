//! Error types for payload decoding

use std::fmt;
use thiserror::Error;

/// Broad category of a decoding failure.
///
/// The numeric codes are stable and shared with other DeviceAtlas Cloud
/// client libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token or structure
    BadData,
    /// Payload version does not match what the caller expects
    VersionMismatch,
    /// Payload file is missing
    NotFound,
}

impl ErrorKind {
    /// Stable numeric code for this kind
    pub const fn code(self) -> u16 {
        match self {
            Self::BadData => 100,
            Self::VersionMismatch => 200,
            Self::NotFound => 300,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadData => "bad data",
            Self::VersionMismatch => "version mismatch",
            Self::NotFound => "not found",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Error raised while decoding a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message} at position {position}")]
pub struct DecodeError {
    kind: ErrorKind,
    message: String,
    position: usize,
}

impl DecodeError {
    /// Create an error of the given kind at a byte offset
    pub fn new(kind: ErrorKind, message: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    /// Malformed input at `position`
    pub fn bad_data(message: impl Into<String>, position: usize) -> Self {
        Self::new(ErrorKind::BadData, message, position)
    }

    /// Payload version rejected by the caller
    pub fn version_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VersionMismatch, message, 0)
    }

    /// Payload file missing
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message, 0)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human readable reason without kind or position
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the input where decoding stopped
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::BadData.code(), 100);
        assert_eq!(ErrorKind::VersionMismatch.code(), 200);
        assert_eq!(ErrorKind::NotFound.code(), 300);
    }

    #[test]
    fn test_error_display() {
        let err = DecodeError::bad_data("Missing value", 7);
        assert_eq!(err.to_string(), "bad data (100): Missing value at position 7");
        assert_eq!(err.kind(), ErrorKind::BadData);
        assert_eq!(err.message(), "Missing value");
        assert_eq!(err.position(), 7);
    }
}
