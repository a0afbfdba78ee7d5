//! IPMB transport daemon.
//!
//! Turns a shared, half-duplex bus into a request/response service for
//! local processes. One [`BusInstance`] per bus runs:
//!
//! - the bus receiver, the only reader of the bus, which validates (and if
//!   needed repairs) every inbound frame and routes it by kind
//! - the request server, which answers requests other nodes send us
//! - the response collector, which hands responses to waiting clients
//! - the client [`Gateway`], which accepts local connections and turns each
//!   into a correlated bus transaction
//!
//! ```text
//!  client ──> Gateway ──> SequenceTable.allocate ──> BusWriter ──> bus
//!                ^                                                  │
//!                └─ SequenceTable.complete <── collector <──┐       │
//!                                                           │       v
//!                 BusWriter <── request server <──────── receiver <─┘
//! ```

pub mod client;
pub mod device;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod instance;

mod collector;
mod receiver;
mod request_server;

pub use device::DeviceTransport;
pub use error::{GatewayError, ServerError};
pub use gateway::{Gateway, bind_socket, socket_path};
pub use handler::{BasicHandler, DeviceIdentity};
pub use instance::BusInstance;
pub use receiver::ingest;
