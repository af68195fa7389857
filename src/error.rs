//! Error types for taskdesk
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, local validation, not signed in)
//! - 3: Authentication failed (rejected credentials, expired recovery link)
//! - 4: Operation failed (backend rejected a request, transport, IO)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskdesk CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const AUTH_FAILED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskdesk operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Record not found: {0}")]
    NotFound(String),

    // Authentication failures (exit code 3)
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid or expired link: {0}")]
    RecoveryExpired(String),

    // Operation failures (exit code 4)
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::NotSignedIn
            | Error::NotFound(_) => exit_codes::USER_ERROR,

            // Authentication
            Error::Auth(_) | Error::RecoveryExpired(_) => exit_codes::AUTH_FAILED,

            // Operation failures
            Error::Backend { .. }
            | Error::Transport(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON output, when the error carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Backend { status, .. } => Some(serde_json::json!({ "status": status })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Error::Backend {
                status,
                message: "request rejected".to_string(),
            },
            other => Error::Transport(other.to_string()),
        }
    }
}

/// Result type alias for taskdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = Error::Validation("Passwords do not match.".to_string());
        assert_eq!(err.to_string(), "Passwords do not match.");
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn backend_details_carry_status() {
        let err = Error::Backend {
            status: 409,
            message: "duplicate key".to_string(),
        };
        let details = err.details().expect("details");
        assert_eq!(details["status"], 409);
    }
}
