//! Error types for the Riya chat core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Riya workspace.
///
/// Every failure the guest-chat orchestrator can observe maps onto one of
/// these variants. Transport, backend, malformed-response, timeout and
/// persistence failures are all handled by the same rollback path, so the
/// variants exist for diagnostics rather than for control flow.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RiyaError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Conversation or guest-record store failure
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The completion endpoint could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The completion endpoint answered with an `error` field or a non-success status
    #[error("Backend error: {0}")]
    Backend(String),

    /// The completion endpoint answered without a usable `messages` array
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The completion call did not settle within the configured bound
    #[error("Completion request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The guest session already used its message allowance
    #[error("Guest message limit reached ({count}/{limit})")]
    LimitReached { count: u32, limit: u32 },

    /// Rejected user input (empty message, invalid onboarding answer, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RiyaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a MalformedResponse error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a limit rejection
    pub fn is_limit_reached(&self) -> bool {
        matches!(self, Self::LimitReached { .. })
    }

    /// Check if this error came from talking to the completion endpoint.
    ///
    /// Returns true for transport, backend, malformed-response and timeout
    /// failures. Persistence failures are not included.
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Backend(_) | Self::MalformedResponse(_) | Self::Timeout { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for RiyaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for RiyaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RiyaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for RiyaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for RiyaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<String> for RiyaError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, RiyaError>`.
pub type Result<T> = std::result::Result<T, RiyaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_failure_classification() {
        assert!(RiyaError::transport("connection refused").is_completion_failure());
        assert!(RiyaError::backend("quota").is_completion_failure());
        assert!(RiyaError::malformed("no messages").is_completion_failure());
        assert!(RiyaError::Timeout { seconds: 30 }.is_completion_failure());
        assert!(!RiyaError::data_access("disk full").is_completion_failure());
    }

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: RiyaError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().contains("NotFound"));
    }

    #[test]
    fn test_limit_reached_message() {
        let err = RiyaError::LimitReached { count: 25, limit: 25 };
        assert!(err.is_limit_reached());
        assert_eq!(err.to_string(), "Guest message limit reached (25/25)");
    }
}
