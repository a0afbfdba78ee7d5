//! Deterministic simulation harness for IPMB daemon testing.
//!
//! An in-memory implementation of the bus transport traits plus a scripted
//! far-end node, so the full daemon can be exercised without hardware.
//! Faults (failed writes) are drawn from a seeded RNG and are reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod remote;
pub mod sim_bus;

pub use remote::RemoteNode;
pub use sim_bus::{FaultConfig, SimBus, SimReader, SimWriter};
