//! Settings parsing and validation for ticketgate
//!
//! Supports TOML settings with:
//! - Versioned schema
//! - Allowed commands and projects ("all" or explicit lists)
//! - Per-project command overrides and record filters
//! - Global search restrictions
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate settings from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<PolicyDocument> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading settings");
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate settings from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<PolicyDocument> {
    let raw: RawConfig = toml::from_str(content)?;

    // Check version
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    // Validate
    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    // Convert to policy
    Ok(PolicyDocument::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;
