//! # AppError
//!
//! Centralized error handling for the Rusty-Reviews ecosystem.
//! Every port and service in `rv-core` reports failures through this type;
//! the web layer decides how each variant is surfaced to the caller.

use thiserror::Error;

/// The primary error type for all rv-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Missing or out-of-range input (e.g., rating outside 1..=5, empty comment)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Resource already exists (e.g., duplicate email or restaurant name)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing or invalid session on a protected action
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials matched an account whose enabled flag is off
    #[error("account disabled")]
    AccountDisabled,

    /// Password comparison failed
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Image store or database call failed
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// Anything else that should never reach a caller verbatim
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn upstream(err: impl std::fmt::Display) -> Self {
        AppError::UpstreamFailure(err.to_string())
    }
}

/// A specialized Result type for Rusty-Reviews logic.
pub type Result<T> = std::result::Result<T, AppError>;
