//! Integration tests for the monitor loop
//!
//! These drive the real event loop against mock hosts with a paused
//! clock, checking the externally observable launch/terminate calls.

use std::sync::Arc;
use std::time::Duration;
use tether_config::{Config, DeviceEntry, MonitorConfig};
use tether_host_api::{CompanionControl, MockCompanion, MockTransport, PresenceSource, RawPresence};
use tether_util::DeviceAddr;
use tetherd::monitor::run_loop;

const PAD: &str = "AA:BB:CC:DD:EE:FF";
const WHEEL: &str = "11:22:33:44:55:66";

fn make_config(timeout: u64, devices: &[(&str, &str)]) -> MonitorConfig {
    let mut config = Config::default();
    config.timeout = timeout;
    for (addr, args) in devices {
        config.devices.insert(
            DeviceAddr::parse(addr).unwrap(),
            DeviceEntry {
                args: args.to_string(),
            },
        );
    }
    MonitorConfig::from_config(&config)
}

struct Harness {
    transport: Arc<MockTransport>,
    companion: Arc<MockCompanion>,
    monitor: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(config: MonitorConfig) -> Self {
        Self::start_with(config, Arc::new(MockTransport::new()))
    }

    /// Start the loop against a pre-scripted transport (for
    /// reconciliation tests).
    fn start_with(config: MonitorConfig, transport: Arc<MockTransport>) -> Self {
        let companion = Arc::new(MockCompanion::new());
        let monitor = tokio::spawn(run_loop(
            config,
            transport.clone() as Arc<dyn PresenceSource>,
            companion.clone() as Arc<dyn CompanionControl>,
        ));
        Self {
            transport,
            companion,
            monitor,
        }
    }

    /// Let the loop drain its queues (auto-advances the paused clock).
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

#[tokio::test(start_paused = true)]
async fn connect_launches_and_grace_expiry_terminates() {
    let h = Harness::start(make_config(5, &[(PAD, "-x")]));
    h.settle().await;

    h.transport.push(RawPresence::connected(PAD));
    h.settle().await;
    assert_eq!(h.companion.launch_calls(), vec!["-x".to_string()]);
    assert_eq!(h.companion.terminate_calls(), 0);

    h.transport.push(RawPresence::disconnected(PAD));
    h.settle().await;

    // Strictly inside the grace period: nothing happens.
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.companion.terminate_calls(), 0);

    // Past the grace period: exactly one termination.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.companion.terminate_calls(), 1);
    assert_eq!(h.companion.launch_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_within_grace_suppresses_kill() {
    let h = Harness::start(make_config(5, &[(PAD, "-x")]));
    h.settle().await;

    h.transport.push(RawPresence::connected(PAD));
    h.settle().await;

    h.transport.push(RawPresence::disconnected(PAD));
    tokio::time::sleep(Duration::from_secs(2)).await;

    h.transport.push(RawPresence::connected(PAD));
    h.settle().await;

    // Long past the original deadline: the kill never lands, and the
    // companion was not relaunched.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.companion.terminate_calls(), 0);
    assert_eq!(h.companion.launch_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn startup_reconciliation_launches_already_present_device() {
    let transport = Arc::new(MockTransport::new());
    transport.set_present(&[PAD]);

    let h = Harness::start_with(make_config(5, &[(PAD, "-x")]), transport);
    h.settle().await;

    // Launched from the reconciliation pass, before any live event.
    assert_eq!(h.companion.launch_calls(), vec!["-x".to_string()]);

    // The reconciled device then behaves like any connected device.
    h.transport.push(RawPresence::disconnected(PAD));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.companion.terminate_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn duplicate_events_do_not_change_action_counts() {
    let h = Harness::start(make_config(5, &[(PAD, "")]));
    h.settle().await;

    h.transport.push(RawPresence::connected(PAD));
    h.transport.push(RawPresence::connected(PAD));
    h.settle().await;
    assert_eq!(h.companion.launch_calls().len(), 1);

    h.transport.push(RawPresence::disconnected(PAD));
    h.transport.push(RawPresence::disconnected(PAD));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.companion.terminate_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_and_malformed_devices_produce_no_actions() {
    let h = Harness::start(make_config(5, &[(PAD, "")]));
    h.settle().await;

    h.transport.push(RawPresence::connected(WHEEL));
    h.transport.push(RawPresence::connected("garbage"));
    h.settle().await;

    assert_eq!(h.companion.launch_calls().len(), 0);
    assert_eq!(h.companion.terminate_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn shared_companion_stops_after_last_grace_period() {
    let h = Harness::start(make_config(5, &[(PAD, "-x"), (WHEEL, "-y")]));
    h.settle().await;

    h.transport.push(RawPresence::connected(PAD));
    h.transport.push(RawPresence::connected(WHEEL));
    h.settle().await;
    // Singleton companion: the second device does not respawn it.
    assert_eq!(h.companion.launch_calls().len(), 1);

    h.transport.push(RawPresence::disconnected(PAD));
    tokio::time::sleep(Duration::from_secs(6)).await;
    // The wheel is still connected, so the pad's expiry changes nothing.
    assert_eq!(h.companion.terminate_calls(), 0);

    h.transport.push(RawPresence::disconnected(WHEEL));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.companion.terminate_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn full_cycle_relaunches_on_next_connect() {
    let h = Harness::start(make_config(5, &[(PAD, "")]));
    h.settle().await;

    h.transport.push(RawPresence::connected(PAD));
    h.settle().await;
    h.transport.push(RawPresence::disconnected(PAD));
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.companion.terminate_calls(), 1);

    h.transport.push(RawPresence::connected(PAD));
    h.settle().await;
    assert_eq!(h.companion.launch_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn lowercase_transport_addresses_match_config() {
    let h = Harness::start(make_config(5, &[(PAD, "-x")]));
    h.settle().await;

    h.transport.push(RawPresence::connected("aa:bb:cc:dd:ee:ff"));
    h.settle().await;
    assert_eq!(h.companion.launch_calls(), vec!["-x".to_string()]);
}

#[tokio::test]
async fn transport_startup_failure_is_fatal() {
    let transport = Arc::new(MockTransport::new());
    *transport.fail_startup.lock().unwrap() = true;

    let companion = Arc::new(MockCompanion::new());
    let result = run_loop(
        make_config(5, &[(PAD, "")]),
        transport as Arc<dyn PresenceSource>,
        companion as Arc<dyn CompanionControl>,
    )
    .await;

    assert!(result.is_err());
}
