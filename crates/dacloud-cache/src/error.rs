//! Error types for cache providers

use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Provider was never initialized (for example its root directory
    /// could not be created)
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Entry could not be persisted
    #[error("Cache write failed for key {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    /// Key cannot be mapped to a storage location
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// IO error during cache operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Shorthand for a [`CacheError::WriteFailed`]
    pub fn write_failed(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the provider itself is unusable, as opposed to a single
    /// entry failing
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
