//! One-shot pairing helpers for the CLI
//!
//! These drive `bluetoothctl` imperatively and are entirely external
//! to the monitoring loop; the monitor core never calls into here.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use tether_host_api::{HostError, HostResult};

/// A device reported by a discovery scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub addr: String,
    pub name: String,
}

/// Pairing result metadata scraped from the transport
#[derive(Debug, Clone, Default)]
pub struct PairingOutcome {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
}

/// Pair, trust and connect a device by address.
///
/// A failed connect after a successful pair is tolerated: input
/// devices often reconnect on their own once trusted.
pub async fn pair_device(addr: &str) -> HostResult<PairingOutcome> {
    run_ctl(&["pair", addr]).await?;
    run_ctl(&["trust", addr]).await?;

    if let Err(e) = run_ctl(&["connect", addr]).await {
        warn!(addr, error = %e, "Connect after pairing failed, device may attach on its own");
    }

    let info = run_ctl(&["info", addr]).await.unwrap_or_default();
    Ok(PairingOutcome {
        name: scrape_field(&info, "Name:"),
        manufacturer: scrape_field(&info, "Manufacturer:"),
    })
}

/// Drop a device's pairing from the transport layer.
pub async fn forget_device(addr: &str) -> HostResult<()> {
    run_ctl(&["remove", addr]).await.map(|_| ())
}

/// Scan for `duration`, then list every device the transport knows.
pub async fn discover(duration: Duration) -> HostResult<Vec<DiscoveredDevice>> {
    let timeout = duration.as_secs().max(1).to_string();
    run_ctl(&["--timeout", &timeout, "scan", "on"]).await?;

    let listing = run_ctl(&["devices"]).await?;
    Ok(listing
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (addr, name) = rest.split_once(' ')?;
            Some(DiscoveredDevice {
                addr: addr.to_string(),
                name: name.to_string(),
            })
        })
        .collect())
}

async fn run_ctl(args: &[&str]) -> HostResult<String> {
    debug!(?args, "Running bluetoothctl");
    let output = Command::new("bluetoothctl")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| HostError::TransportUnavailable(format!("bluetoothctl: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HostError::Internal(format!(
            "bluetoothctl {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn scrape_field(info: &str, field: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix(field))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrapes_name_from_info_output() {
        let info = "Device AA:BB:CC:DD:EE:FF (public)\n\tName: Wireless Controller\n\tAlias: Wireless Controller\n\tPaired: yes\n";
        assert_eq!(
            scrape_field(info, "Name:"),
            Some("Wireless Controller".to_string())
        );
        assert_eq!(scrape_field(info, "Manufacturer:"), None);
    }
}
