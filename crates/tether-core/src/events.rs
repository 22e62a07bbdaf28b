//! Events and action requests flowing through the monitor core

use chrono::{DateTime, Local};
use std::time::Duration;
use tether_util::DeviceAddr;

/// Presence transition kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    Disconnected,
}

/// A normalized presence event, one per transport signal
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub addr: DeviceAddr,
    pub kind: EventKind,
    pub timestamp: DateTime<Local>,
}

impl DeviceEvent {
    pub fn new(addr: DeviceAddr, kind: EventKind) -> Self {
        Self {
            addr,
            kind,
            timestamp: Local::now(),
        }
    }
}

/// Message sent by an expired disconnect timer back into the event
/// loop. Carries the device identifier explicitly instead of capturing
/// it in a per-device closure, so the fire path goes back through the
/// store's re-check like any other input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFire {
    pub addr: DeviceAddr,
}

/// At most one of these is returned by each state store transition.
/// The store itself performs no I/O; the event loop translates these
/// into scheduler and dispatcher calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    /// Start the companion for a newly connected device
    Launch { addr: DeviceAddr, args: String },

    /// Cancel the pending disconnect timer for a reconnected device
    Cancel { addr: DeviceAddr },

    /// Start the disconnect grace timer for a device
    ScheduleKill {
        addr: DeviceAddr,
        grace_period: Duration,
    },

    /// Stop the companion: the last tracked device's grace period expired
    Kill,
}
