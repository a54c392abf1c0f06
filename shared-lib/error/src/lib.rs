//! Common error types for the forum services.
//!
//! This crate provides unified error handling across the workspace and the
//! mapping from internal errors to what a client is allowed to see.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation failure for a single named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Fail with a field-level validation error when `value` is blank.
    pub fn require(field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(Self::validation(field, format!("{field} is required")));
        }
        Ok(())
    }

    /// HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Auth(err) => err.status_code(),
            AppError::Validation { .. } | AppError::DuplicateUsername | AppError::DuplicateEmail => {
                400
            }
            AppError::NotFound(_) => 404,
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => 500,
        }
    }
}

/// Authentication-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Password did not match the stored hash.
    #[error("Invalid credentials")]
    BadPassword,

    /// Missing, malformed, forged or expired token. Deliberately carries no
    /// detail about which check failed.
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Account is banned")]
    Banned,

    #[error("Forbidden")]
    Forbidden,

    #[error("Token creation failed")]
    TokenCreationFailed,
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::BadPassword | AuthError::Unauthenticated => 401,
            AuthError::Banned | AuthError::Forbidden => 403,
            AuthError::TokenCreationFailed => 500,
        }
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        // BadPassword and Unauthenticated share one code and message.
        let (code, message) = match err {
            AuthError::BadPassword | AuthError::Unauthenticated => {
                ("AUTH_UNAUTHENTICATED", "Invalid credentials or token")
            }
            AuthError::Banned => ("AUTH_BANNED", "Account is banned and cannot sign in"),
            AuthError::Forbidden => ("AUTH_FORBIDDEN", "Access forbidden"),
            AuthError::TokenCreationFailed => ("AUTH_TOKEN_CREATION_FAILED", "Failed to create token"),
        };
        Self::new(code, message)
    }
}

impl From<&DatabaseError> for ErrorResponse {
    fn from(err: &DatabaseError) -> Self {
        let (code, message) = match err {
            DatabaseError::ConnectionFailed(_) => ("DB_CONNECTION_FAILED", "Database connection failed"),
            DatabaseError::QueryFailed(_) => ("DB_QUERY_FAILED", "Database query failed"),
        };
        Self::new(code, message)
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Auth(e) => e.into(),
            AppError::Database(e) => e.into(),
            AppError::Validation { field, message } => {
                Self::new("VALIDATION_FAILED", message.clone()).with_details(field.clone())
            }
            AppError::DuplicateUsername => Self::new("DUPLICATE_USERNAME", "Username is already taken"),
            AppError::DuplicateEmail => Self::new("DUPLICATE_EMAIL", "Email is already registered"),
            AppError::NotFound(what) => Self::new("NOT_FOUND", format!("{what} not found")),
            AppError::Configuration(_) | AppError::Internal(_) => {
                Self::new("INTERNAL_ERROR", "Internal server error")
            }
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failures_are_indistinguishable() {
        let bad_password = ErrorResponse::from(&AuthError::BadPassword);
        let bad_token = ErrorResponse::from(&AuthError::Unauthenticated);

        assert_eq!(bad_password.code, bad_token.code);
        assert_eq!(bad_password.message, bad_token.message);
        assert_eq!(AuthError::BadPassword.status_code(), 401);
        assert_eq!(AuthError::Unauthenticated.status_code(), 401);
    }

    #[test]
    fn test_banned_and_forbidden_are_distinct() {
        let banned = ErrorResponse::from(&AuthError::Banned);
        let forbidden = ErrorResponse::from(&AuthError::Forbidden);

        assert_ne!(banned.code, forbidden.code);
        assert_eq!(AuthError::Forbidden.status_code(), 403);
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = AppError::Database(DatabaseError::QueryFailed("syntax error near 'users'".into()));
        let response = ErrorResponse::from(&err);

        assert_eq!(err.status_code(), 500);
        assert!(!response.message.contains("users"));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_database_errors_are_server_errors() {
        for err in [
            DatabaseError::ConnectionFailed("refused".into()),
            DatabaseError::QueryFailed("deadlock".into()),
        ] {
            let response = ErrorResponse::from(&err);
            assert!(response.code.starts_with("DB_"));
            assert_eq!(AppError::from(err).status_code(), 500);
        }
    }

    #[test]
    fn test_require_names_the_field() {
        let err = AppError::require("email", "   ").unwrap_err();
        assert_eq!(err.status_code(), 400);

        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "VALIDATION_FAILED");
        assert_eq!(response.details.as_deref(), Some("email"));

        assert!(AppError::require("email", "a@x.com").is_ok());
    }
}
