//! tetherd - presence-driven companion supervisor
//!
//! The `run` subcommand is the long-lived monitor; everything else is
//! a one-shot config or pairing operation that edits the JSON config
//! and exits. Only `run` ever touches the state machine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tether_config::{DeviceEntry, PairedDevice, load_config, save_config};
use tether_host_linux::pairing;
use tether_util::{DeviceAddr, default_config_path};
use tetherd::{monitor, service_unit};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Launch a companion process while a paired device is in range
#[derive(Parser, Debug)]
#[command(name = "tetherd", version, about)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "TETHER_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Log level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor loop in the foreground
    Run,

    /// Add or update a device on the allow-list
    AddDevice {
        /// Device hardware address (AA:BB:CC:DD:EE:FF)
        addr: DeviceAddr,

        /// Extra arguments appended to the companion invocation
        #[arg(long, default_value = "")]
        args: String,
    },

    /// Remove a device from the allow-list and forget its pairing
    RemoveDevice {
        addr: DeviceAddr,
    },

    /// Set the disconnect grace period in seconds
    SetTimeout {
        seconds: u64,
    },

    /// List configured devices
    Devices,

    /// Pair a device and add it to the allow-list
    Pair {
        addr: DeviceAddr,

        /// Friendly name stored alongside the pairing metadata
        #[arg(long)]
        nickname: Option<String>,

        /// Extra arguments appended to the companion invocation
        #[arg(long, default_value = "")]
        args: String,
    },

    /// Scan for nearby devices
    Scan {
        /// Scan duration in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },

    /// Manage the systemd user service
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

#[derive(Subcommand, Debug)]
enum ServiceAction {
    /// Install the systemd user unit
    Install,
    /// Remove the systemd user unit
    Uninstall,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Run => {
            info!(version = env!("CARGO_PKG_VERSION"), "tetherd starting");
            monitor::run(&cli.config).await
        }

        Command::AddDevice { addr, args } => {
            let mut config = load_config(&cli.config)?;
            config
                .devices
                .insert(addr.clone(), DeviceEntry { args: args.clone() });
            save_config(&cli.config, &config)?;
            println!("Added device {addr} with args {args:?}");
            Ok(())
        }

        Command::RemoveDevice { addr } => {
            let mut config = load_config(&cli.config)?;
            let known = config.devices.remove(&addr).is_some();
            config.allowed_devices.remove(&addr);
            save_config(&cli.config, &config)?;

            // Best-effort: also drop the pairing at the transport layer.
            if let Err(e) = pairing::forget_device(addr.as_str()).await {
                warn!(addr = %addr, error = %e, "Could not remove transport pairing");
            }

            if known {
                println!("Removed device {addr}");
            } else {
                println!("Device {addr} was not configured");
            }
            Ok(())
        }

        Command::SetTimeout { seconds } => {
            let mut config = load_config(&cli.config)?;
            config.timeout = seconds;
            save_config(&cli.config, &config)?;
            println!("Set timeout to {seconds} seconds");
            Ok(())
        }

        Command::Devices => {
            let config = load_config(&cli.config)?;
            if config.devices.is_empty() {
                println!("No devices configured");
                return Ok(());
            }
            for (addr, entry) in &config.devices {
                let label = config
                    .allowed_devices
                    .get(addr)
                    .and_then(|d| d.nickname.clone().or_else(|| d.name.clone()))
                    .unwrap_or_default();
                println!("{addr}  {label}  args: {:?}", entry.args);
            }
            Ok(())
        }

        Command::Pair { addr, nickname, args } => {
            println!("Pairing {addr}...");
            let outcome = pairing::pair_device(addr.as_str())
                .await
                .context("Pairing failed")?;

            let mut config = load_config(&cli.config)?;
            config
                .devices
                .insert(addr.clone(), DeviceEntry { args });
            config.allowed_devices.insert(
                addr.clone(),
                PairedDevice {
                    name: outcome.name.clone(),
                    manufacturer: outcome.manufacturer.clone(),
                    nickname,
                },
            );
            save_config(&cli.config, &config)?;

            match outcome.name {
                Some(name) => println!("Paired {addr} ({name})"),
                None => println!("Paired {addr}"),
            }
            Ok(())
        }

        Command::Scan { seconds } => {
            println!("Scanning for {seconds} seconds...");
            let found = pairing::discover(Duration::from_secs(seconds))
                .await
                .context("Scan failed")?;
            for device in found {
                println!("{}  {}", device.addr, device.name);
            }
            Ok(())
        }

        Command::Service { action } => match action {
            ServiceAction::Install => {
                let unit = service_unit::install(&cli.config)?;
                println!("Installed {}", unit.display());
                println!("Enable with: systemctl --user daemon-reload && systemctl --user enable --now tetherd");
                Ok(())
            }
            ServiceAction::Uninstall => {
                match service_unit::uninstall()? {
                    Some(unit) => println!("Removed {}", unit.display()),
                    None => println!("No service unit installed"),
                }
                Ok(())
            }
        },
    }
}
