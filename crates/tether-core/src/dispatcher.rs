//! Idempotent translation of action requests into companion effects

use std::sync::Arc;
use tether_host_api::CompanionControl;
use tether_util::DeviceAddr;
use tracing::{debug, info, warn};

/// The only component allowed to start or stop the companion process.
///
/// The companion is a singleton shared by all tracked devices, so a
/// single running flag is enough to make both operations safe to call
/// redundantly. Spawn and stop failures are logged and otherwise
/// ignored: device connectivity bookkeeping is independent of whether
/// the side effect actually took hold.
pub struct ActionDispatcher {
    control: Arc<dyn CompanionControl>,
    running: bool,
}

impl ActionDispatcher {
    pub fn new(control: Arc<dyn CompanionControl>) -> Self {
        Self {
            control,
            running: false,
        }
    }

    /// Whether the companion is considered running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the companion for a newly connected device. No-op if the
    /// companion is already considered running.
    pub async fn launch(&mut self, addr: &DeviceAddr, args: &str) {
        if self.running {
            debug!(addr = %addr, "Companion already running, launch suppressed");
            return;
        }

        // The flag is set even if the spawn fails: the device is still
        // connected, and a later disconnect must run cleanup normally.
        self.running = true;

        match self.control.launch(args).await {
            Ok(()) => info!(addr = %addr, args, "Companion launched"),
            Err(e) => warn!(addr = %addr, error = %e, "Companion launch failed"),
        }
    }

    /// Stop the companion. No-op if it is not considered running.
    pub async fn terminate(&mut self) {
        if !self.running {
            debug!("Companion not running, terminate suppressed");
            return;
        }

        self.running = false;

        match self.control.terminate().await {
            Ok(()) => info!("Companion stopped"),
            Err(e) => warn!(error = %e, "Companion terminate failed"),
        }
    }
}
