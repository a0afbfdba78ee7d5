//! Wire format for the Intelligent Platform Management Bus.
//!
//! Every IPMB message is a short checksum-framed byte sequence. A fixed
//! 6-byte header (zero-copy binary) carries addressing, the network function,
//! the requester sequence number and the command; a variable body follows and
//! a single data checksum byte closes the frame.
//!
//! ```text
//! Request : rsSA | netFn/rsLUN | hdrCk | rqSA | rqSeq/rqLUN | cmd | data.. | dataCk
//! Response: rqSA | netFn/rqLUN | hdrCk | rsSA | rqSeq/rsLUN | cmd | cc | data.. | dataCk
//! ```
//!
//! Parsing never trusts the wire: both checksums are verified before a
//! [`Frame`] is handed out. The [`repair`] module recovers frames mangled by a
//! known slave-read defect in some bus drivers before validation.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checksum;
pub mod errors;
pub mod frame;
pub mod header;
pub mod opcodes;
pub mod repair;

pub use checksum::{checksum, validate_header, validate_trailer};
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, FrameKind};
pub use header::{Endpoint, FrameHeader};
pub use opcodes::{CompletionCode, NetFn};
pub use repair::{RepairOutcome, RepairStrategy, decode_with_repair, repair_header};

/// Largest frame the bus can carry, in bytes.
pub const MAX_FRAME_SIZE: usize = 255;

/// Number of distinct requester sequence numbers (6 bits on the wire).
pub const SEQ_NUM_MAX: usize = 64;

/// Default 8-bit slave address of the BMC on its IPMB buses.
pub const BMC_SLAVE_ADDR: u8 = 0x20;

/// Default 8-bit slave address of the bridge IC on the far side of a bus.
pub const BRIDGE_SLAVE_ADDR: u8 = 0x40;
