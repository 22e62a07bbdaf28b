//! Configuration loading and persistence for tetherd
//!
//! The config file is a JSON document with:
//! - `devices`: the allow-list the monitor acts on (address -> args)
//! - `timeout`: disconnect grace period in seconds
//! - `companion`: the companion command to launch
//! - `allowed_devices`: pairing metadata used only by the CLI
//!
//! A missing file yields the defaults; a file that exists but does not
//! parse is an error, surfaced as fatal at daemon startup.

mod schema;

pub use schema::*;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tether_util::DeviceAddr;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load configuration from a JSON file.
///
/// A missing file is not an error: the defaults are returned so a
/// fresh install works before any device has been added.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Config file missing, using defaults");
            return Ok(Config::default());
        }
        Err(e) => return Err(e.into()),
    };

    parse_config(&content)
}

/// Parse configuration from a JSON string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    Ok(serde_json::from_str(content)?)
}

/// Persist configuration as pretty-printed JSON, creating parent
/// directories as needed. Used by the CLI mutations only; the running
/// monitor never writes config.
pub fn save_config(path: impl AsRef<Path>, config: &Config) -> ConfigResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Immutable per-device settings handed to the monitor core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub addr: DeviceAddr,
    pub args: String,
}

/// The read-only view of the configuration the monitor core runs on
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub devices: HashMap<DeviceAddr, DeviceConfig>,
    pub grace_period: Duration,
    pub companion: String,
}

impl MonitorConfig {
    pub fn from_config(config: &Config) -> Self {
        let devices = config
            .devices
            .iter()
            .map(|(addr, entry)| {
                (
                    addr.clone(),
                    DeviceConfig {
                        addr: addr.clone(),
                        args: entry.args.clone(),
                    },
                )
            })
            .collect();

        Self {
            devices,
            grace_period: Duration::from_secs(config.timeout),
            companion: config.companion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("does-not-exist.json")).unwrap();

        assert!(config.devices.is_empty());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.companion, DEFAULT_COMPANION);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn malformed_address_is_an_error() {
        let result = parse_config(r#"{"devices": {"not-an-addr": {"args": ""}}}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn parse_minimal_config() {
        let config = parse_config(
            r#"{
                "devices": { "aa:bb:cc:dd:ee:ff": { "args": "-x" } },
                "timeout": 5
            }"#,
        )
        .unwrap();

        let addr = DeviceAddr::parse("AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(config.devices[&addr].args, "-x");
        assert_eq!(config.timeout, 5);
        assert_eq!(config.companion, DEFAULT_COMPANION);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let addr = DeviceAddr::parse("AA:BB:CC:DD:EE:FF").unwrap();
        let mut config = Config::default();
        config.devices.insert(addr.clone(), DeviceEntry { args: "-x".into() });
        config.timeout = 42;
        config.allowed_devices.insert(
            addr.clone(),
            PairedDevice {
                name: Some("Gamepad".into()),
                manufacturer: None,
                nickname: Some("couch".into()),
            },
        );

        save_config(&path, &config).unwrap();
        let reloaded = load_config(&path).unwrap();

        assert_eq!(reloaded.timeout, 42);
        assert_eq!(reloaded.devices[&addr].args, "-x");
        assert_eq!(reloaded.allowed_devices[&addr].nickname.as_deref(), Some("couch"));
    }

    #[test]
    fn monitor_config_projection() {
        let config = parse_config(
            r#"{
                "devices": { "AA:BB:CC:DD:EE:FF": { "args": "-x" } },
                "timeout": 5,
                "allowed_devices": { "AA:BB:CC:DD:EE:FF": { "name": "pad" } }
            }"#,
        )
        .unwrap();

        let monitor = MonitorConfig::from_config(&config);
        let addr = DeviceAddr::parse("AA:BB:CC:DD:EE:FF").unwrap();

        assert_eq!(monitor.grace_period, Duration::from_secs(5));
        assert_eq!(monitor.devices[&addr].args, "-x");
        assert_eq!(monitor.companion, DEFAULT_COMPANION);
    }
}
