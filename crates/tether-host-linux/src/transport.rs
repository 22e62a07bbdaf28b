//! Presence feed from BlueZ via `bluetoothctl`
//!
//! The daemon does not speak D-Bus itself; it supervises a
//! `bluetoothctl` child in monitor mode and parses its line output.
//! The startup reconciliation query is a one-shot
//! `bluetoothctl devices Connected` invocation.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tether_host_api::{HostError, HostResult, PresenceSource, RawPresence};

/// Default transport program
const BLUETOOTHCTL: &str = "bluetoothctl";

/// Presence source backed by a supervised `bluetoothctl` child.
pub struct BluetoothctlTransport {
    program: String,
}

impl BluetoothctlTransport {
    pub fn new() -> Self {
        Self {
            program: BLUETOOTHCTL.to_string(),
        }
    }

    /// Override the transport binary (tests, unusual installs).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for BluetoothctlTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceSource for BluetoothctlTransport {
    async fn current_presence(&self) -> HostResult<Vec<RawPresence>> {
        let output = Command::new(&self.program)
            .args(["devices", "Connected"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| HostError::TransportUnavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(HostError::TransportUnavailable(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .filter_map(parse_device_line)
            .map(RawPresence::connected)
            .collect())
    }

    async fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<RawPresence>> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::TransportUnavailable(format!("{}: {e}", self.program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::Internal("bluetoothctl stdout not captured".into()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let program = self.program.clone();

        // The child (and its held-open stdin) lives as long as the
        // reader task; dropping stdin would end monitor mode.
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = parse_monitor_line(&line) {
                            debug!(addr = %event.addr, connected = event.connected, "Transport signal");
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        warn!(program = %program, "Transport stream ended");
                        break;
                    }
                    Err(e) => {
                        warn!(program = %program, error = %e, "Transport read failed");
                        break;
                    }
                }
            }
            let _ = child.kill().await;
        });

        Ok(rx)
    }
}

/// Parse one line of `bluetoothctl devices Connected` output:
/// `Device AA:BB:CC:DD:EE:FF Some Name`
fn parse_device_line(line: &str) -> Option<String> {
    let rest = strip_ansi(line);
    let rest = rest.trim().strip_prefix("Device ")?;
    let addr = rest.split_whitespace().next()?;
    looks_like_addr(addr).then(|| addr.to_string())
}

/// Parse one line of `bluetoothctl` monitor output.
///
/// Connection edges arrive as `[CHG] Device <ADDR> Connected: yes|no`;
/// a removed device object (`[DEL] Device <ADDR> ...`) counts as a
/// disconnect. Everything else (discovery chatter, RSSI changes,
/// prompts) is skipped.
fn parse_monitor_line(line: &str) -> Option<RawPresence> {
    let clean = strip_ansi(line);
    let clean = clean.trim();

    if let Some(rest) = clean.strip_prefix("[CHG] Device ") {
        let mut parts = rest.split_whitespace();
        let addr = parts.next()?;
        if !looks_like_addr(addr) {
            return None;
        }
        if parts.next()? != "Connected:" {
            return None;
        }
        return match parts.next()? {
            "yes" => Some(RawPresence::connected(addr)),
            "no" => Some(RawPresence::disconnected(addr)),
            _ => None,
        };
    }

    if let Some(rest) = clean.strip_prefix("[DEL] Device ") {
        let addr = rest.split_whitespace().next()?;
        return looks_like_addr(addr).then(|| RawPresence::disconnected(addr));
    }

    None
}

/// Cheap shape check; real validation happens at the ingestor.
fn looks_like_addr(s: &str) -> bool {
    s.len() == 17 && s.bytes().filter(|&b| b == b':').count() == 5
}

/// Remove ANSI color sequences and the readline \x01/\x02 markers
/// bluetoothctl wraps its tags in.
fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                // Skip to the terminating letter of the CSI sequence.
                for e in chars.by_ref() {
                    if e.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            '\u{01}' | '\u{02}' => {}
            _ => out.push(c),
        }
    }
    out
}
