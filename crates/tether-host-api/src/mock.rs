//! Mock host implementations for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{CompanionControl, HostError, HostResult, PresenceSource, RawPresence};

/// Mock transport for unit/integration testing.
///
/// Startup presence is scripted via `set_present`; live events are
/// pushed with `push` after the monitor has subscribed.
pub struct MockTransport {
    present: Mutex<Vec<RawPresence>>,
    event_tx: mpsc::UnboundedSender<RawPresence>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<RawPresence>>>,

    /// Configure the startup query to fail
    pub fail_startup: Arc<Mutex<bool>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            present: Mutex::new(Vec::new()),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
            fail_startup: Arc::new(Mutex::new(false)),
        }
    }

    /// Script the devices reported present at startup
    pub fn set_present(&self, addrs: &[&str]) {
        let mut present = self.present.lock().unwrap();
        *present = addrs.iter().map(|a| RawPresence::connected(*a)).collect();
    }

    /// Push a live presence notification
    pub fn push(&self, event: RawPresence) {
        // Receiver dropped means the monitor is gone; nothing to do.
        let _ = self.event_tx.send(event);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceSource for MockTransport {
    async fn current_presence(&self) -> HostResult<Vec<RawPresence>> {
        if *self.fail_startup.lock().unwrap() {
            return Err(HostError::TransportUnavailable("mock failure".into()));
        }
        Ok(self.present.lock().unwrap().clone())
    }

    async fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<RawPresence>> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| HostError::Internal("already subscribed".into()))
    }
}

/// Mock companion control that records every call
pub struct MockCompanion {
    launches: Mutex<Vec<String>>,
    terminates: Mutex<u32>,

    /// Configure launch to fail
    pub fail_launch: Arc<Mutex<bool>>,

    /// Configure terminate to fail
    pub fail_terminate: Arc<Mutex<bool>>,
}

impl MockCompanion {
    pub fn new() -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            terminates: Mutex::new(0),
            fail_launch: Arc::new(Mutex::new(false)),
            fail_terminate: Arc::new(Mutex::new(false)),
        }
    }

    /// Argument strings of every launch so far
    pub fn launch_calls(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }

    /// Number of terminate calls so far
    pub fn terminate_calls(&self) -> u32 {
        *self.terminates.lock().unwrap()
    }
}

impl Default for MockCompanion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompanionControl for MockCompanion {
    async fn launch(&self, args: &str) -> HostResult<()> {
        self.launches.lock().unwrap().push(args.to_string());
        if *self.fail_launch.lock().unwrap() {
            return Err(HostError::SpawnFailed("mock failure".into()));
        }
        Ok(())
    }

    async fn terminate(&self) -> HostResult<()> {
        *self.terminates.lock().unwrap() += 1;
        if *self.fail_terminate.lock().unwrap() {
            return Err(HostError::StopFailed("mock failure".into()));
        }
        Ok(())
    }
}
