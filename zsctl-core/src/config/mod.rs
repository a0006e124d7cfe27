//! Watcher configuration
//!
//! Handles loading the JSON configuration for the periodic check loop from
//! the user's configuration directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration for the periodic check loop
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Seconds to sleep between check cycles (must be positive)
    #[serde(rename = "wait_between_checks_in_seconds")]
    pub wait_between_checks: u64,

    /// Executable invoked with a single message argument on notification
    pub notification_bin: PathBuf,
}

impl WatchConfig {
    /// Load the configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_path(&get_config_path()?)
    }

    /// Load the configuration from a specific file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("failed to read config file: {e}"),
        })?;

        let mut config: WatchConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseFailed {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })?;

        if config.wait_between_checks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "wait_between_checks_in_seconds".to_string(),
                message: "must be a positive number of seconds".to_string(),
            });
        }

        config.notification_bin = resolve_notifier(&config.notification_bin);
        Ok(config)
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: &Path) -> PathBuf {
    let Ok(home) = std::env::var("HOME") else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) => PathBuf::from(home).join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Resolve the notifier executable path
///
/// `~` is expanded; a bare command name is looked up on PATH. A notifier
/// that cannot be found is a warning, not an error: the watcher still runs,
/// it just cannot raise notifications.
fn resolve_notifier(bin: &Path) -> PathBuf {
    let expanded = expand_home(bin);
    if expanded.exists() {
        return expanded;
    }

    if bin.components().count() == 1 {
        if let Ok(found) = which::which(bin) {
            return found;
        }
    }

    warn!(
        "invalid 'notification_bin', file does not exist: {}",
        expanded.display()
    );
    expanded
}

/// Get the configuration directory
///
/// Returns ~/.config/zsctl on Linux, or ZSCTL_CONFIG_DIR if set.
/// SUDO_USER fallback is kept so `sudo zsctl` resolves the invoking user's
/// configuration rather than root's.
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(config_dir) = std::env::var("ZSCTL_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{sudo_user}"))
    } else {
        std::env::var("HOME").map_err(|_| ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })?
    };

    Ok(PathBuf::from(home).join(".config").join("zsctl"))
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}
