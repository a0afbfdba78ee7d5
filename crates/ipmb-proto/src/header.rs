//! Fixed 6-byte frame header.
//!
//! The header is identical in shape for requests and responses; only the
//! meaning of the two address/LUN pairs flips. `dest` is whoever the frame is
//! travelling to, `src` whoever sent it.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    SEQ_NUM_MAX,
    checksum::checksum,
    errors::{ProtocolError, Result},
    frame::FrameKind,
};

const LUN_BITS: u8 = 2;
const LUN_MASK: u8 = 0b11;

/// A slave address paired with a logical unit number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// 8-bit slave address (write form, low bit clear)
    pub addr: u8,
    /// Logical unit number (0..=3)
    pub lun: u8,
}

impl Endpoint {
    /// Endpoint at `addr`, LUN 0.
    pub const fn new(addr: u8) -> Self {
        Self { addr, lun: 0 }
    }

    /// Endpoint at `addr` with an explicit LUN. Only the low two bits of
    /// `lun` are kept.
    pub const fn with_lun(addr: u8, lun: u8) -> Self {
        Self { addr, lun: lun & LUN_MASK }
    }
}

/// On-wire frame header.
///
/// ```text
/// 0: dest_addr   1: netfn<<2 | dest_lun   2: header checksum
/// 3: src_addr    4: seq<<2   | src_lun    5: cmd
/// ```
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct FrameHeader {
    dest_addr: u8,
    netfn_lun: u8,
    header_checksum: u8,
    src_addr: u8,
    seq_lun: u8,
    cmd: u8,
}

impl FrameHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 6;

    /// Build a header with a freshly computed header checksum.
    ///
    /// `netfn` is truncated to 6 bits and `seq` is taken modulo
    /// [`SEQ_NUM_MAX`].
    pub fn new(dest: Endpoint, netfn: u8, src: Endpoint, seq: u8, cmd: u8) -> Self {
        let netfn_lun = (netfn << LUN_BITS) | (dest.lun & LUN_MASK);
        let seq_lun = ((seq % SEQ_NUM_MAX as u8) << LUN_BITS) | (src.lun & LUN_MASK);
        Self {
            dest_addr: dest.addr,
            netfn_lun,
            header_checksum: checksum(&[dest.addr, netfn_lun]),
            src_addr: src.addr,
            seq_lun,
            cmd,
        }
    }

    /// Read a header from the front of `bytes`.
    ///
    /// Checksums are not verified here; see [`crate::Frame::decode`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Raw header bytes.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Destination slave address.
    pub fn dest_addr(&self) -> u8 {
        self.dest_addr
    }

    /// Destination LUN.
    pub fn dest_lun(&self) -> u8 {
        self.netfn_lun & LUN_MASK
    }

    /// Destination address and LUN together.
    pub fn dest(&self) -> Endpoint {
        Endpoint::with_lun(self.dest_addr, self.dest_lun())
    }

    /// Network function code.
    pub fn netfn(&self) -> u8 {
        self.netfn_lun >> LUN_BITS
    }

    /// Raw `netFn << 2 | LUN` byte.
    pub fn netfn_lun(&self) -> u8 {
        self.netfn_lun
    }

    /// Header checksum byte as carried.
    pub fn header_checksum(&self) -> u8 {
        self.header_checksum
    }

    /// Source slave address.
    pub fn src_addr(&self) -> u8 {
        self.src_addr
    }

    /// Source LUN.
    pub fn src_lun(&self) -> u8 {
        self.seq_lun & LUN_MASK
    }

    /// Source address and LUN together.
    pub fn src(&self) -> Endpoint {
        Endpoint::with_lun(self.src_addr, self.src_lun())
    }

    /// Requester sequence number.
    pub fn seq(&self) -> u8 {
        self.seq_lun >> LUN_BITS
    }

    /// Command code.
    pub fn cmd(&self) -> u8 {
        self.cmd
    }

    /// Even network functions are requests, odd ones responses.
    pub fn kind(&self) -> FrameKind {
        if self.netfn() % 2 == 0 { FrameKind::Request } else { FrameKind::Response }
    }

    /// Whether the carried header checksum matches bytes 0..2.
    pub fn is_checksum_valid(&self) -> bool {
        checksum(&[self.dest_addr, self.netfn_lun]) == self.header_checksum
    }
}

impl fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHeader")
            .field("dest", &format_args!("{:#04x}/{}", self.dest_addr, self.dest_lun()))
            .field("netfn", &format_args!("{:#04x}", self.netfn()))
            .field("src", &format_args!("{:#04x}/{}", self.src_addr, self.src_lun()))
            .field("seq", &self.seq())
            .field("cmd", &format_args!("{:#04x}", self.cmd))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_matches_layout() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
    }

    #[test]
    fn new_packs_fields() {
        let header =
            FrameHeader::new(Endpoint::new(0x40), 0x38, Endpoint::with_lun(0x20, 1), 17, 0x09);

        assert_eq!(header.to_bytes(), [0x40, 0xE0, 0xE0, 0x20, 0x45, 0x09]);
        assert_eq!(header.netfn(), 0x38);
        assert_eq!(header.seq(), 17);
        assert_eq!(header.src_lun(), 1);
        assert_eq!(header.kind(), FrameKind::Request);
        assert!(header.is_checksum_valid());
    }

    #[test]
    fn odd_netfn_is_response() {
        let header = FrameHeader::new(Endpoint::new(0x20), 0x07, Endpoint::new(0x40), 0, 0x01);
        assert_eq!(header.kind(), FrameKind::Response);
    }

    #[test]
    fn from_bytes_roundtrips() {
        let bytes = [0x20, 0x18, 0xC8, 0x81, 0x0C, 0x01];
        let header = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.to_bytes(), bytes);
        assert_eq!(header.seq(), 3);
        assert_eq!(header.netfn(), 0x06);
    }

    #[test]
    fn from_bytes_rejects_short_input() {
        let result = FrameHeader::from_bytes(&[0x20, 0x18, 0xC8]);
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 6, actual: 3 }));
    }

    #[test]
    fn sequence_wraps_into_six_bits() {
        let header = FrameHeader::new(Endpoint::new(0x40), 0x06, Endpoint::new(0x20), 65, 0x01);
        assert_eq!(header.seq(), 1);
    }
}
