//! Shared plumbing for the IPMB transport daemon.
//!
//! Everything here is independent of a concrete bus or client socket:
//!
//! - [`sequence`]: Sequence table correlating responses with pending requests
//! - [`transport`]: Bus transport abstraction (slave reads, master writes)
//! - [`writer`]: Serialized, retrying bus write path
//! - [`handler`]: Command-processing collaborator for inbound requests
//! - [`config`]: Per-bus tunables
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod handler;
pub mod sequence;
pub mod transport;
pub mod writer;

pub use config::{AllowedCommand, BusConfig};
pub use error::{BusError, SequenceError};
pub use handler::{CommandHandler, IpmiRequest, IpmiResponse};
pub use sequence::{SequenceTable, SlotLease};
pub use transport::{BusRead, BusTransport, BusWrite};
pub use writer::BusWriter;
