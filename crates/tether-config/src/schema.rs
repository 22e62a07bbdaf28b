//! Raw configuration schema (as parsed from JSON)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tether_util::DeviceAddr;

/// Default companion command when none is configured
pub const DEFAULT_COMPANION: &str = "moonlight-qt";

/// Default disconnect grace period in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// On-disk configuration document.
///
/// Addresses are typed map keys, so a malformed address anywhere in the
/// file is a parse error rather than an entry that silently never
/// matches at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Allow-list the monitor acts on: address -> launch arguments
    pub devices: HashMap<DeviceAddr, DeviceEntry>,

    /// Seconds to wait after a disconnect before stopping the companion
    pub timeout: u64,

    /// Companion command started when a device appears
    pub companion: String,

    /// Pairing metadata, written by the CLI pairing flow.
    /// The monitor core never reads this.
    pub allowed_devices: HashMap<DeviceAddr, PairedDevice>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devices: HashMap::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
            companion: DEFAULT_COMPANION.to_string(),
            allowed_devices: HashMap::new(),
        }
    }
}

/// Per-device monitor entry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceEntry {
    /// Extra arguments appended to the companion invocation
    pub args: String,
}

/// Pairing metadata for a device, as reported during pairing
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PairedDevice {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub nickname: Option<String>,
}
