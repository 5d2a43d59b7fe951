//! Error types for hostlink.
//!
//! Visibility changes applied before an engine instance exists are not errors;
//! they are reported as a plain `false` ("not applied") by the coordinator.
//! The variants here cover programmer misuse, collaborator failures and the
//! few environmental failures of the optional helpers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the hostlink crate.
#[derive(Debug, Error)]
pub enum HostError {
    // Lifecycle errors
    #[error("Instantiation request was already started")]
    AlreadyInstantiated,

    #[error("Engine creation failed: {message}")]
    EngineCreation { message: String },

    #[error("Engine instance has not been created yet")]
    InstanceUnavailable,

    #[error("Consumer hooks were dropped before instantiation started")]
    HooksUnavailable,

    // Validation errors
    #[error("Invalid value for {field}: {message}")]
    InvalidArgument { field: String, message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Async runtime errors
    #[error("No async runtime available to run the dispatch pump")]
    RuntimeUnavailable,

    #[error("Operation was cancelled")]
    Cancelled,

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for hostlink operations.
pub type Result<T> = std::result::Result<T, HostError>;

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl HostError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        HostError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error for a named parameter.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        HostError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports incorrect use of the API rather than a
    /// failure of the environment or of an injected collaborator.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            HostError::AlreadyInstantiated | HostError::InvalidArgument { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HostError::invalid("tap_threshold", "must be >= 1");
        assert_eq!(err.to_string(), "Invalid value for tap_threshold: must be >= 1");
        assert_eq!(
            HostError::AlreadyInstantiated.to_string(),
            "Instantiation request was already started"
        );
    }

    #[test]
    fn test_misuse_classification() {
        assert!(HostError::AlreadyInstantiated.is_misuse());
        assert!(HostError::invalid("x", "y").is_misuse());
        assert!(!HostError::InstanceUnavailable.is_misuse());
        assert!(!HostError::EngineCreation {
            message: "boom".into()
        }
        .is_misuse());
    }

    #[test]
    fn test_json_conversion() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: HostError = parse_err.into();
        assert!(matches!(err, HostError::Json { .. }));
    }
}
