//! Cancellable per-device disconnect timers

use std::collections::HashMap;
use std::time::Duration;
use tether_util::DeviceAddr;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::TimerFire;

/// Handle to a scheduled disconnect timer.
///
/// Cancelling a timer whose task already fired is a safe no-op; the
/// fire message is resolved by the store's re-check, not by
/// cancellation being instantaneous.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Runs at most one cancellable delayed fire per device.
///
/// Each timer is a spawned task that sleeps and then sends a
/// `TimerFire` message back into the event loop; the device identifier
/// travels in the message, so no per-device callback closures exist.
pub struct TimeoutScheduler {
    timers: HashMap<DeviceAddr, TimerHandle>,
    fire_tx: mpsc::UnboundedSender<TimerFire>,
}

impl TimeoutScheduler {
    /// `fire_tx` is the event loop's timer channel.
    pub fn new(fire_tx: mpsc::UnboundedSender<TimerFire>) -> Self {
        Self {
            timers: HashMap::new(),
            fire_tx,
        }
    }

    /// Schedule the disconnect fire for a device.
    ///
    /// The store only schedules from the connected -> pending edge, so
    /// no live timer should exist here; if one does, it is aborted
    /// first. At most one timer per device, always.
    pub fn schedule(&mut self, addr: DeviceAddr, duration: Duration) -> TimerHandle {
        if let Some(existing) = self.timers.remove(&addr) {
            debug!(addr = %addr, "Replacing existing timer");
            existing.cancel();
        }

        let tx = self.fire_tx.clone();
        let fire_addr = addr.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Receiver gone means the loop is shutting down.
            let _ = tx.send(TimerFire { addr: fire_addr });
        });

        let handle = TimerHandle {
            abort: task.abort_handle(),
        };
        self.timers.insert(addr, handle.clone());
        handle
    }

    /// Best-effort cancellation. A timer that already fired, or was
    /// never scheduled, is silently left alone.
    pub fn cancel(&mut self, addr: &DeviceAddr) {
        if let Some(handle) = self.timers.remove(addr) {
            handle.cancel();
        }
    }

    /// Number of timers currently tracked (fired timers linger until
    /// the next schedule or cancel for the same device).
    pub fn tracked(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAD: &str = "AA:BB:CC:DD:EE:FF";

    fn addr(s: &str) -> DeviceAddr {
        DeviceAddr::parse(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_duration() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TimeoutScheduler::new(tx);

        scheduler.schedule(addr(PAD), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err(), "must not fire early");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv().unwrap(), TimerFire { addr: addr(PAD) });
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_fire_suppresses_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TimeoutScheduler::new(tx);

        scheduler.schedule(addr(PAD), Duration::from_secs(5));
        scheduler.cancel(&addr(PAD));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.tracked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_aborts_previous_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TimeoutScheduler::new(tx);

        scheduler.schedule(addr(PAD), Duration::from_secs(2));
        scheduler.schedule(addr(PAD), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err(), "aborted timer must not fire");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(rx.try_recv().unwrap(), TimerFire { addr: addr(PAD) });
        assert!(rx.try_recv().is_err(), "exactly one fire");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_noop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TimeoutScheduler::new(tx);

        let handle = scheduler.schedule(addr(PAD), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_ok());

        // Both cancellation paths must tolerate the fired timer.
        handle.cancel();
        scheduler.cancel(&addr(PAD));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn timers_for_different_devices_are_independent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TimeoutScheduler::new(tx);
        let other = addr("11:22:33:44:55:66");

        scheduler.schedule(addr(PAD), Duration::from_secs(2));
        scheduler.schedule(other.clone(), Duration::from_secs(5));
        scheduler.cancel(&addr(PAD));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.try_recv().unwrap(), TimerFire { addr: other });
        assert!(rx.try_recv().is_err());
    }
}
