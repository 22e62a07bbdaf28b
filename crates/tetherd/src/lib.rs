//! tetherd library surface
//!
//! The monitor loop and service-unit helpers live here so the
//! integration tests can drive them against mock hosts; `main.rs`
//! provides the CLI around them.

pub mod monitor;
pub mod service_unit;
