//! Daemon error types.

use std::{io, path::PathBuf};

use ipmb_core::{BusError, SequenceError};
use ipmb_proto::ProtocolError;
use thiserror::Error;

/// Why a client request produced no response payload.
///
/// Every variant is reported to the client as a zero-length reply.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The client bytes are not a usable request.
    #[error("malformed client request: {0}")]
    Malformed(&'static str),

    /// Restricted mode is on and this is not the allowed command.
    #[error("netfn {netfn:#04x} cmd {cmd:#04x} rejected in restricted mode")]
    Restricted {
        /// Requested network function
        netfn: u8,
        /// Requested command
        cmd: u8,
    },

    /// No sequence slot available.
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// The request could not be written to the bus.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The request does not encode into a bus frame.
    #[error(transparent)]
    Frame(#[from] ProtocolError),

    /// Nothing came back within the response timeout.
    #[error("no response for sequence number {0}")]
    Timeout(u8),
}

/// Failures acquiring the resources a bus instance needs at startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A bus handle could not be opened.
    #[error("failed to open bus {bus} {role} handle: {source}")]
    Transport {
        /// Bus number
        bus: u8,
        /// `"slave"` or `"master"`
        role: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The client socket could not be bound.
    #[error("failed to bind client socket {}: {source}", path.display())]
    Bind {
        /// Socket path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Other I/O failure (signal handler installation).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
