//! Error types shared by the daemon components.

use std::io;

use thiserror::Error;

/// Sequence table failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Every slot is allocated.
    #[error("no free sequence number ({capacity} outstanding)")]
    Exhausted {
        /// Table capacity
        capacity: usize,
    },

    /// A response arrived for a slot nobody is waiting on. Expected when a
    /// client has already timed out.
    #[error("no request waiting on sequence number {0}")]
    NotWaiting(u8),
}

/// Bus I/O failures.
#[derive(Debug, Error)]
pub enum BusError {
    /// The write kept failing after every retry.
    #[error("bus write failed after {attempts} attempts: {source}")]
    WriteFailed {
        /// Attempts made
        attempts: u32,
        /// Last underlying error
        #[source]
        source: io::Error,
    },
}
