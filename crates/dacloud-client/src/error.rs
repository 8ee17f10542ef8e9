//! Error types for client operations

use dacloud_cache::CacheError;
use dacloud_json::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The service refused the caller, e.g. an invalid licence key. No
    /// other endpoint is tried.
    #[error("{0}")]
    Fatal(String),

    /// Every candidate failed; one message per endpoint, in call order
    #[error("{}", .0.join("\n"))]
    AllEndpointsFailed(Vec<String>),

    #[error("No server has been defined.")]
    NoEndpointsConfigured,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Property {name} is not convertible to {expected}")]
    IncorrectPropertyType {
        name: String,
        expected: &'static str,
    },
}

impl ClientError {
    /// Whether the error must stop all further endpoint attempts
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Per-endpoint failure messages carried by the error
    pub fn endpoint_errors(&self) -> &[String] {
        match self {
            Self::AllEndpointsFailed(errors) => errors,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregated_message() {
        let err = ClientError::AllEndpointsFailed(vec![
            "2: first failed".to_string(),
            "2: second failed".to_string(),
        ]);
        assert_eq!(err.to_string(), "2: first failed\n2: second failed");
        assert_eq!(err.endpoint_errors().len(), 2);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_channel() {
        let err = ClientError::Fatal("1: Forbidden".to_string());
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "1: Forbidden");
        assert!(err.endpoint_errors().is_empty());
        assert_eq!(
            ClientError::NoEndpointsConfigured.to_string(),
            "No server has been defined."
        );
    }
}
