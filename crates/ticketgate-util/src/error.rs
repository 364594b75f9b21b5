//! Error types for ticketgate

use thiserror::Error;

/// Command-layer error type for ticketgate operations.
///
/// A policy denial and invalid input are kept apart so callers can react
/// differently (e.g. distinct exit codes).
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl GateError {
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
