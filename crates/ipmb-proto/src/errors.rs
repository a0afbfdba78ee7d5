//! Protocol error types.

use thiserror::Error;

/// Result alias for frame codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while parsing or repairing a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes than the smallest valid frame of this kind.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum length for the frame kind
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// More bytes than the bus can carry.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Length of the offending buffer
        size: usize,
        /// Maximum frame size
        max: usize,
    },

    /// Header checksum does not match bytes 0..2.
    #[error("header checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    HeaderChecksum {
        /// Checksum computed over the header
        expected: u8,
        /// Checksum byte carried by the frame
        found: u8,
    },

    /// Data checksum does not match the body.
    #[error("data checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    DataChecksum {
        /// Checksum computed over the body
        expected: u8,
        /// Trailing checksum byte carried by the frame
        found: u8,
    },

    /// Header checksum still fails after every repair strategy was tried.
    #[error("header unrecoverable after {attempts} repair attempts")]
    HeaderUnrecoverable {
        /// Number of repair strategies applied
        attempts: usize,
    },
}
