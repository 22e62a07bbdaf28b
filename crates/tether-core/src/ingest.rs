//! Normalization boundary between the transport and the state store

use std::collections::HashSet;
use tether_config::MonitorConfig;
use tether_host_api::RawPresence;
use tether_util::DeviceAddr;
use tracing::debug;

use crate::{DeviceEvent, EventKind};

/// Turns raw transport notifications into normalized `DeviceEvent`s.
///
/// The transport's address is treated as an opaque string until it
/// parses as a hardware address; malformed addresses and devices not
/// on the allow-list are dropped here, silently, before they can reach
/// the store.
pub struct SignalIngestor {
    allow: HashSet<DeviceAddr>,
}

impl SignalIngestor {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            allow: config.devices.keys().cloned().collect(),
        }
    }

    /// Normalize one raw notification, or drop it.
    pub fn normalize(&self, raw: &RawPresence) -> Option<DeviceEvent> {
        let addr = match DeviceAddr::parse(&raw.addr) {
            Ok(addr) => addr,
            Err(_) => {
                debug!(addr = %raw.addr, "Dropping signal with malformed address");
                return None;
            }
        };

        if !self.allow.contains(&addr) {
            debug!(addr = %addr, "Dropping signal for unconfigured device");
            return None;
        }

        let kind = if raw.connected {
            EventKind::Connected
        } else {
            EventKind::Disconnected
        };

        Some(DeviceEvent::new(addr, kind))
    }
}
