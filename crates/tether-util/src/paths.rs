//! Default paths for tetherd components
//!
//! Paths are user-writable (no root required):
//! - Config: `$XDG_CONFIG_HOME/tether/config.json` or `~/.config/tether/config.json`
//! - Systemd unit: `~/.config/systemd/user/tetherd.service`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const TETHER_CONFIG_ENV: &str = "TETHER_CONFIG";

/// Config filename within the app config directory
const CONFIG_FILENAME: &str = "config.json";

/// Application subdirectory name
const APP_DIR: &str = "tether";

/// Systemd user unit filename
pub const SERVICE_UNIT_NAME: &str = "tetherd.service";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$TETHER_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/tether/config.json` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/tether/config.json` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(TETHER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking TETHER_CONFIG env var.
/// Used for default values where the env var is checked separately.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the systemd user unit directory (`~/.config/systemd/user`).
pub fn systemd_user_unit_dir() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join("systemd").join("user");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("systemd")
            .join("user");
    }

    PathBuf::from("/tmp").join("systemd").join("user")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_app_dir() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("tether"));
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn unit_dir_is_systemd_user() {
        let dir = systemd_user_unit_dir();
        assert!(dir.to_string_lossy().contains("systemd"));
        assert!(dir.to_string_lossy().ends_with("user"));
    }
}
