//! Linux host integration for tetherd
//!
//! - `BluetoothctlTransport`: presence feed by supervising `bluetoothctl`
//! - `CompanionProcess`: companion spawn/terminate with process groups
//! - `pairing`: one-shot helpers for the CLI pairing flow

mod companion;
pub mod pairing;
mod transport;

pub use companion::*;
pub use transport::*;
