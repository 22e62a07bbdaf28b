//! Host interfaces for tetherd
//!
//! This crate defines the two seams between the monitor core and the
//! platform:
//! - `PresenceSource`: the transport that reports device presence
//! - `CompanionControl`: starting and stopping the companion process
//!
//! Mock implementations for tests live in `mock`.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
