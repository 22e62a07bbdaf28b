//! Host adapter traits

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Stop failed: {0}")]
    StopFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// A raw presence notification as delivered by the transport.
///
/// The address is whatever string the transport reports; the ingestor
/// normalizes it before it can reach the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPresence {
    pub addr: String,
    pub connected: bool,
}

impl RawPresence {
    pub fn connected(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connected: true,
        }
    }

    pub fn disconnected(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connected: false,
        }
    }
}

/// The transport that reports device presence.
///
/// `current_presence` answers the startup reconciliation query;
/// `subscribe` starts the live notification stream. Both failing is
/// fatal to the monitor: it cannot function without the feed.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    /// List devices the transport currently considers connected.
    async fn current_presence(&self) -> HostResult<Vec<RawPresence>>;

    /// Start streaming live presence notifications.
    async fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<RawPresence>>;
}

/// Start/stop control over the companion process.
///
/// The companion is a singleton: there is no per-device instance and
/// no IPC beyond start and stop.
#[async_trait]
pub trait CompanionControl: Send + Sync {
    /// Start the companion with the given argument string appended.
    async fn launch(&self, args: &str) -> HostResult<()>;

    /// Request termination of the companion. Best-effort; stopping a
    /// companion that already exited must succeed silently.
    async fn terminate(&self) -> HostResult<()>;
}
