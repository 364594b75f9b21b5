//! Default paths for ticketgate
//!
//! The settings file lives in the user's config directory:
//! - `$TICKETGATE_CONFIG` if set
//! - `$XDG_CONFIG_HOME/ticketgate/settings.toml`
//! - `~/.config/ticketgate/settings.toml`

use std::path::PathBuf;

/// Environment variable for overriding the settings file path
pub const TICKETGATE_CONFIG_ENV: &str = "TICKETGATE_CONFIG";

/// Settings filename within the config directory
const SETTINGS_FILENAME: &str = "settings.toml";

/// Application subdirectory name
const APP_DIR: &str = "ticketgate";

/// Get the default settings file path.
///
/// Order of precedence:
/// 1. `$TICKETGATE_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/ticketgate/settings.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/ticketgate/settings.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(TICKETGATE_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the settings path without checking TICKETGATE_CONFIG.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(SETTINGS_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(SETTINGS_FILENAME);
    }

    // Last resort
    PathBuf::from("/etc").join(APP_DIR).join(SETTINGS_FILENAME)
}
