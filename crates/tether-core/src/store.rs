//! Connection state store: the per-device presence state machine

use std::collections::HashMap;
use tether_config::MonitorConfig;
use tether_util::DeviceAddr;
use tracing::{debug, info, trace};

use crate::{ActionRequest, DeviceEvent, EventKind, TimerHandle};

/// Presence state of a single tracked device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Disconnected,
    Connected,
    /// Disconnect signal seen, grace timer running
    PendingDisconnect,
}

/// State entry for one configured device.
///
/// Created lazily on the first relevant event and kept for the
/// lifetime of the process; a departed device is reset to
/// `Disconnected`, never removed.
#[derive(Debug)]
pub struct DeviceState {
    pub addr: DeviceAddr,
    pub status: PresenceStatus,
    /// Invariant: `Some` iff `status` is `PendingDisconnect`
    pub pending_timer: Option<TimerHandle>,
}

impl DeviceState {
    fn new(addr: DeviceAddr) -> Self {
        Self {
            addr,
            status: PresenceStatus::Disconnected,
            pending_timer: None,
        }
    }
}

/// The authoritative mapping from device address to presence state.
///
/// Owned by the monitor event loop, which serializes every `apply` and
/// `timer_fired` call; transitions are deterministic and idempotent
/// under duplicated or reordered signals. The store never performs I/O
/// and never blocks: it only decides, returning at most one
/// `ActionRequest` per input.
pub struct ConnectionStateStore {
    devices: HashMap<DeviceAddr, DeviceState>,
    config: MonitorConfig,
}

impl ConnectionStateStore {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            devices: HashMap::new(),
            config,
        }
    }

    /// Apply one presence event and decide what, if anything, to do.
    ///
    /// Transition table for a single device:
    /// - `Disconnected` + connect -> `Connected`, launch
    /// - `Connected` + connect -> no-op (duplicate signal)
    /// - `Connected` + disconnect -> `PendingDisconnect`, schedule kill
    /// - `PendingDisconnect` + connect -> `Connected`, cancel timer
    ///   (no relaunch; the companion is presumed still running)
    /// - `PendingDisconnect` + disconnect -> no-op
    /// - `Disconnected` + disconnect -> no-op
    pub fn apply(&mut self, event: &DeviceEvent) -> Option<ActionRequest> {
        // The ingestor drops unconfigured devices before they get
        // here; an unknown address still must not create state.
        let Some(device_cfg) = self.config.devices.get(&event.addr) else {
            debug!(addr = %event.addr, "Ignoring event for unconfigured device");
            return None;
        };
        let args = device_cfg.args.clone();
        let grace_period = self.config.grace_period;

        let state = self
            .devices
            .entry(event.addr.clone())
            .or_insert_with(|| DeviceState::new(event.addr.clone()));

        match (state.status, event.kind) {
            (PresenceStatus::Disconnected, EventKind::Connected) => {
                state.status = PresenceStatus::Connected;
                info!(addr = %state.addr, "Device connected");
                Some(ActionRequest::Launch {
                    addr: state.addr.clone(),
                    args,
                })
            }

            (PresenceStatus::Connected, EventKind::Connected) => {
                debug!(addr = %state.addr, "Duplicate connect signal suppressed");
                None
            }

            (PresenceStatus::Connected, EventKind::Disconnected) => {
                state.status = PresenceStatus::PendingDisconnect;
                info!(
                    addr = %state.addr,
                    grace_secs = grace_period.as_secs(),
                    "Device disconnected, grace period started"
                );
                Some(ActionRequest::ScheduleKill {
                    addr: state.addr.clone(),
                    grace_period,
                })
            }

            (PresenceStatus::PendingDisconnect, EventKind::Connected) => {
                state.status = PresenceStatus::Connected;
                state.pending_timer = None;
                info!(addr = %state.addr, "Device reconnected within grace period");
                Some(ActionRequest::Cancel {
                    addr: state.addr.clone(),
                })
            }

            (PresenceStatus::PendingDisconnect, EventKind::Disconnected) => {
                debug!(addr = %state.addr, "Duplicate disconnect signal suppressed");
                None
            }

            (PresenceStatus::Disconnected, EventKind::Disconnected) => None,
        }
    }

    /// Authoritative re-check when a disconnect timer fires.
    ///
    /// A timer racing a concurrent cancellation resolves here: if the
    /// device has already left `PendingDisconnect`, the fire is a
    /// silent no-op. A kill is only requested when the last tracked
    /// device's grace period expires, since the companion is shared.
    pub fn timer_fired(&mut self, addr: &DeviceAddr) -> Option<ActionRequest> {
        let state = self.devices.get_mut(addr)?;

        if state.status != PresenceStatus::PendingDisconnect {
            trace!(addr = %addr, "Stale timer fire ignored");
            return None;
        }

        state.status = PresenceStatus::Disconnected;
        state.pending_timer = None;

        let remaining = self.wanted_count();
        if remaining == 0 {
            info!(addr = %addr, "Grace period expired, companion no longer wanted");
            Some(ActionRequest::Kill)
        } else {
            info!(
                addr = %addr,
                active_devices = remaining,
                "Grace period expired, other devices still active"
            );
            None
        }
    }

    /// Record the timer handle for a device in its grace period.
    /// Ignored unless the device is actually `PendingDisconnect`,
    /// which keeps the handle/status invariant intact if the device
    /// reconnected between scheduling and attachment.
    pub fn attach_timer(&mut self, addr: &DeviceAddr, handle: TimerHandle) {
        if let Some(state) = self.devices.get_mut(addr)
            && state.status == PresenceStatus::PendingDisconnect
        {
            state.pending_timer = Some(handle);
        }
    }

    /// Number of devices currently holding the companion open
    /// (connected, or disconnected with the grace period still running).
    pub fn wanted_count(&self) -> usize {
        self.devices
            .values()
            .filter(|s| {
                matches!(
                    s.status,
                    PresenceStatus::Connected | PresenceStatus::PendingDisconnect
                )
            })
            .count()
    }

    /// Current status of every tracked device.
    pub fn snapshot(&self) -> HashMap<DeviceAddr, PresenceStatus> {
        self.devices
            .iter()
            .map(|(addr, state)| (addr.clone(), state.status))
            .collect()
    }
}
