//! Recovery for frames mangled by the slave-read path.
//!
//! Some bus drivers hand back inbound frames whose leading destination byte
//! is wrong: either a neighbouring byte was duplicated over it, or it was
//! dropped entirely and the whole frame arrives shifted left by one. Both
//! show up as a header checksum failure on a frame that was addressed to us.
//!
//! Each defect has its own [`RepairStrategy`]. Strategies run in order
//! against the original bytes and the first candidate whose header checksum
//! holds wins. Only the header is repaired; a bad data checksum is never
//! patched.

use std::fmt;

use crate::{
    MAX_FRAME_SIZE,
    checksum::validate_header,
    errors::{ProtocolError, Result},
    frame::Frame,
};

/// One way of patching a frame's leading address byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairStrategy {
    /// The first byte was overwritten; put the local address back.
    DuplicatedAddressByte,
    /// The first byte is missing; prepend the local address.
    MissingAddressByte,
}

impl RepairStrategy {
    /// Strategies in the order they are attempted.
    pub const ORDERED: [Self; 2] = [Self::DuplicatedAddressByte, Self::MissingAddressByte];

    /// Candidate bytes after applying this strategy to `raw`, or `None` when
    /// the strategy does not apply.
    pub fn apply(self, raw: &[u8], local_addr: u8) -> Option<Vec<u8>> {
        match self {
            Self::DuplicatedAddressByte => {
                let (&first, rest) = raw.split_first()?;
                if first == local_addr {
                    return None;
                }
                let mut candidate = Vec::with_capacity(raw.len());
                candidate.push(local_addr);
                candidate.extend_from_slice(rest);
                Some(candidate)
            },
            Self::MissingAddressByte => {
                if raw.is_empty() || raw.len() >= MAX_FRAME_SIZE {
                    return None;
                }
                let mut candidate = Vec::with_capacity(raw.len() + 1);
                candidate.push(local_addr);
                candidate.extend_from_slice(raw);
                Some(candidate)
            },
        }
    }
}

impl fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatedAddressByte => f.write_str("duplicated address byte"),
            Self::MissingAddressByte => f.write_str("missing address byte"),
        }
    }
}

/// Bytes with a valid header checksum, and the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    /// Frame bytes whose header checksum validates
    pub bytes: Vec<u8>,
    /// `None` when the input was already valid
    pub strategy: Option<RepairStrategy>,
}

/// Make the header checksum of `raw` hold, patching the address byte if
/// needed.
///
/// A frame whose header already validates comes back untouched.
///
/// # Errors
///
/// `HeaderUnrecoverable` when no strategy yields a valid header.
pub fn repair_header(raw: &[u8], local_addr: u8) -> Result<RepairOutcome> {
    if validate_header(raw) {
        return Ok(RepairOutcome { bytes: raw.to_vec(), strategy: None });
    }

    let mut attempts = 0;
    for strategy in RepairStrategy::ORDERED {
        let Some(candidate) = strategy.apply(raw, local_addr) else {
            continue;
        };
        attempts += 1;
        if validate_header(&candidate) {
            return Ok(RepairOutcome { bytes: candidate, strategy: Some(strategy) });
        }
    }

    Err(ProtocolError::HeaderUnrecoverable { attempts })
}

/// Repair the header of `raw`, then fully decode it.
///
/// The data checksum is only checked after the header is good, and a
/// failure there is final.
pub fn decode_with_repair(raw: &[u8], local_addr: u8) -> Result<(Frame, Option<RepairStrategy>)> {
    let outcome = repair_header(raw, local_addr)?;
    let frame = Frame::decode(&outcome.bytes)?;
    Ok((frame, outcome.strategy))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::frame::FrameKind;

    const LOCAL: u8 = 0x20;
    const GOOD: [u8; 7] = hex!("20 18 c8 81 08 01 76");

    #[test]
    fn valid_frame_is_untouched() {
        let outcome = repair_header(&GOOD, LOCAL).unwrap();
        assert_eq!(outcome.strategy, None);
        assert_eq!(outcome.bytes, GOOD);
    }

    #[test]
    fn duplicated_address_byte_is_replaced() {
        let mut raw = GOOD;
        raw[0] = raw[1];

        let (frame, strategy) = decode_with_repair(&raw, LOCAL).unwrap();
        assert_eq!(strategy, Some(RepairStrategy::DuplicatedAddressByte));
        assert_eq!(frame, Frame::decode(&GOOD).unwrap());
    }

    #[test]
    fn missing_address_byte_is_prepended() {
        let raw = &GOOD[1..];

        let (frame, strategy) = decode_with_repair(raw, LOCAL).unwrap();
        assert_eq!(strategy, Some(RepairStrategy::MissingAddressByte));
        assert_eq!(frame.kind(), FrameKind::Request);
        assert_eq!(frame, Frame::decode(&GOOD).unwrap());
    }

    #[test]
    fn duplicated_strategy_skips_matching_address() {
        assert_eq!(RepairStrategy::DuplicatedAddressByte.apply(&GOOD, LOCAL), None);
        assert_eq!(RepairStrategy::DuplicatedAddressByte.apply(&[], LOCAL), None);
    }

    #[test]
    fn missing_strategy_respects_frame_limit() {
        let raw = vec![0u8; MAX_FRAME_SIZE];
        assert_eq!(RepairStrategy::MissingAddressByte.apply(&raw, LOCAL), None);
    }

    #[test]
    fn garbage_is_unrecoverable() {
        let result = repair_header(&hex!("11 22 33 44 55 66 77"), LOCAL);
        assert_eq!(result, Err(ProtocolError::HeaderUnrecoverable { attempts: 2 }));
    }

    #[test]
    fn bad_trailer_is_never_repaired() {
        let mut raw = GOOD;
        raw[0] = 0x00;
        raw[6] ^= 0xFF;

        let result = decode_with_repair(&raw, LOCAL);
        assert!(matches!(result, Err(ProtocolError::DataChecksum { .. })));
    }
}
