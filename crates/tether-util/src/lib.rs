//! Shared utilities for tetherd
//!
//! This crate provides:
//! - The `DeviceAddr` hardware-address type (normalized form, map key)
//! - Default paths for the config file and the systemd user unit

mod addr;
mod paths;

pub use addr::*;
pub use paths::*;
