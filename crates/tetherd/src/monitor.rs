//! The monitor event loop
//!
//! One task owns the state store, scheduler and dispatcher; it
//! serializes presence events, timer fires and Unix signals through a
//! single `select!`. Startup reconciliation runs, and its actions are
//! dispatched, before the live subscription is consumed, so a device
//! that is already in range launches the companion immediately.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use tether_config::{MonitorConfig, load_config};
use tether_core::{
    ActionDispatcher, ActionRequest, ConnectionStateStore, SignalIngestor, TimeoutScheduler,
};
use tether_host_api::{CompanionControl, PresenceSource};
use tether_host_linux::{BluetoothctlTransport, CompanionProcess};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Load the config and run the monitor against the real Linux hosts.
pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let monitor_config = MonitorConfig::from_config(&config);

    info!(
        device_count = monitor_config.devices.len(),
        grace_secs = monitor_config.grace_period.as_secs(),
        companion = %monitor_config.companion,
        "Monitor starting"
    );

    let transport = Arc::new(BluetoothctlTransport::new());
    let companion = Arc::new(CompanionProcess::new(monitor_config.companion.clone()));

    run_loop(monitor_config, transport, companion).await
}

/// The monitor loop proper, generic over the host seams.
pub async fn run_loop(
    config: MonitorConfig,
    transport: Arc<dyn PresenceSource>,
    companion: Arc<dyn CompanionControl>,
) -> Result<()> {
    let ingestor = SignalIngestor::new(&config);
    let mut store = ConnectionStateStore::new(config);
    let (fire_tx, mut fire_rx) = mpsc::unbounded_channel();
    let mut scheduler = TimeoutScheduler::new(fire_tx);
    let mut dispatcher = ActionDispatcher::new(companion);

    // Startup reconciliation. A transport that cannot answer is fatal:
    // the monitor is useless without the presence feed.
    let present = transport
        .current_presence()
        .await
        .context("Transport presence query failed")?;
    for raw in &present {
        if let Some(event) = ingestor.normalize(raw)
            && let Some(action) = store.apply(&event)
        {
            handle_action(action, &mut store, &mut scheduler, &mut dispatcher).await;
        }
    }

    let mut presence_rx = transport
        .subscribe()
        .await
        .context("Transport subscription failed")?;

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    info!("Monitor running");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }

            raw = presence_rx.recv() => {
                match raw {
                    Some(raw) => {
                        if let Some(event) = ingestor.normalize(&raw)
                            && let Some(action) = store.apply(&event)
                        {
                            handle_action(action, &mut store, &mut scheduler, &mut dispatcher).await;
                        }
                    }
                    None => {
                        error!("Transport stream closed");
                        bail!("transport stream closed");
                    }
                }
            }

            Some(fire) = fire_rx.recv() => {
                if let Some(action) = store.timer_fired(&fire.addr) {
                    handle_action(action, &mut store, &mut scheduler, &mut dispatcher).await;
                }
                // Drop the fired entry; aborting a finished task is a no-op.
                scheduler.cancel(&fire.addr);
            }
        }
    }

    info!("Monitor stopped");
    Ok(())
}

/// Translate one store decision into scheduler/dispatcher effects.
async fn handle_action(
    action: ActionRequest,
    store: &mut ConnectionStateStore,
    scheduler: &mut TimeoutScheduler,
    dispatcher: &mut ActionDispatcher,
) {
    match action {
        ActionRequest::Launch { addr, args } => {
            dispatcher.launch(&addr, &args).await;
        }
        ActionRequest::ScheduleKill { addr, grace_period } => {
            let handle = scheduler.schedule(addr.clone(), grace_period);
            store.attach_timer(&addr, handle);
        }
        ActionRequest::Cancel { addr } => {
            scheduler.cancel(&addr);
        }
        ActionRequest::Kill => {
            dispatcher.terminate().await;
        }
    }
}
