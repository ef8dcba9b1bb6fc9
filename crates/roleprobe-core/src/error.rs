//! Error types for roleprobe operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all roleprobe crates. Uses `thiserror` for derive macros.
//!
//! Two classes of failure flow through this type. Setup failures (account
//! provisioning, sign-in) are propagated with `?` and abort a run. Probe
//! failures (CRUD calls) are caught by the probe runner and turned into an
//! [`Outcome`](crate::Outcome); [`Error::is_permission_denied`] decides
//! whether a failure is a rule denial or something else.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in roleprobe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity backend already holds an account with this email.
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// Account or document not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The security rules rejected the request.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Sign-in was rejected (bad credentials, disabled account).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The backend answered with an unexpected error status.
    #[error("Backend error {status}: {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the backend.
        message: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {message}")]
    Transport {
        /// What was being attempted.
        message: String,
        /// Underlying client error.
        #[source]
        source: Option<BoxError>,
    },

    /// Invalid data or format.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an account-exists error for the given email.
    pub fn account_exists(email: impl Into<String>) -> Self {
        Self::AccountExists(email.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a permission denied error.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a backend error from a status code and message.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping the client error that caused it.
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Whether the security rules rejected the request.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Whether account creation hit an existing account.
    pub fn is_account_exists(&self) -> bool {
        matches!(self, Self::AccountExists(_))
    }

    /// Whether the account or document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using roleprobe's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_inspectors() {
        assert!(Error::permission_denied("rules").is_permission_denied());
        assert!(Error::account_exists("a@example.com").is_account_exists());
        assert!(Error::not_found("doc").is_not_found());
        assert!(!Error::backend(500, "boom").is_permission_denied());
        assert!(!Error::transport("connect").is_account_exists());
    }

    #[test]
    fn test_display() {
        let err = Error::backend(400, "INVALID_ARGUMENT");
        assert_eq!(err.to_string(), "Backend error 400: INVALID_ARGUMENT");

        let err = Error::account_exists("admin@example.com");
        assert_eq!(err.to_string(), "Account already exists: admin@example.com");
    }

    #[test]
    fn test_transport_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::transport_with_source("POST accounts", io);
        assert_eq!(err.to_string(), "Transport error: POST accounts");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
