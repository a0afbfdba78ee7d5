//! Complete IPMB frames: header, body and trailing data checksum.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    MAX_FRAME_SIZE,
    checksum::checksum,
    errors::{ProtocolError, Result},
    header::{Endpoint, FrameHeader},
};

/// Offset of the first byte covered by the data checksum.
const DATA_START: usize = 3;

/// Request or response, decided by the parity of the network function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Even network function
    Request,
    /// Odd network function
    Response,
}

impl FrameKind {
    /// Smallest valid encoded frame of this kind.
    pub fn min_size(self) -> usize {
        match self {
            // header + data checksum
            Self::Request => FrameHeader::SIZE + 1,
            // header + completion code + data checksum
            Self::Response => FrameHeader::SIZE + 2,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
        }
    }
}

/// A validated IPMB frame.
///
/// The body is everything between the header and the data checksum. For
/// responses it starts with the completion code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    body: Bytes,
}

impl Frame {
    /// Assemble a frame from a header and body.
    pub fn new(header: FrameHeader, body: impl Into<Bytes>) -> Self {
        Self { header, body: body.into() }
    }

    /// Build a request frame.
    pub fn request(
        dest: Endpoint,
        netfn: u8,
        src: Endpoint,
        seq: u8,
        cmd: u8,
        data: impl Into<Bytes>,
    ) -> Self {
        Self::new(FrameHeader::new(dest, netfn, src, seq, cmd), data)
    }

    /// Build the response to `request`.
    ///
    /// Addresses swap, the network function gains its response bit and
    /// the sequence number and command are echoed back.
    pub fn response_to(request: &Self, completion_code: u8, data: &[u8]) -> Self {
        let req = &request.header;
        let header = FrameHeader::new(req.src(), req.netfn() | 1, req.dest(), req.seq(), req.cmd());

        let mut body = BytesMut::with_capacity(data.len() + 1);
        body.put_u8(completion_code);
        body.put_slice(data);

        Self::new(header, body.freeze())
    }

    /// Parse and fully validate a frame.
    ///
    /// # Errors
    ///
    /// - `FrameTooLarge` if the buffer exceeds [`MAX_FRAME_SIZE`]
    /// - `FrameTooShort` if it is shorter than the minimum for its kind
    /// - `HeaderChecksum` / `DataChecksum` on checksum mismatch
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: bytes.len(), max: MAX_FRAME_SIZE });
        }

        let header = FrameHeader::from_bytes(bytes)?;
        if !header.is_checksum_valid() {
            return Err(ProtocolError::HeaderChecksum {
                expected: checksum(&bytes[..2]),
                found: header.header_checksum(),
            });
        }

        let min = header.kind().min_size();
        if bytes.len() < min {
            return Err(ProtocolError::FrameTooShort { expected: min, actual: bytes.len() });
        }

        let last = bytes.len() - 1;
        let expected = checksum(&bytes[DATA_START..last]);
        if expected != bytes[last] {
            return Err(ProtocolError::DataChecksum { expected, found: bytes[last] });
        }

        Ok(Self { header, body: Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..last]) })
    }

    /// Length once encoded, trailer included.
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.body.len() + 1
    }

    /// Encode into a fresh buffer, computing the data checksum.
    ///
    /// # Errors
    ///
    /// `FrameTooLarge` if the encoded frame would not fit on the bus.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let size = self.encoded_len();
        if size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE });
        }

        let mut out = BytesMut::with_capacity(size);
        out.put_slice(&self.header.to_bytes());
        out.put_slice(&self.body);
        let data_checksum = checksum(&out[DATA_START..]);
        out.put_u8(data_checksum);

        Ok(out.freeze())
    }

    /// Frame header.
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Body between header and trailer.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request or response.
    pub fn kind(&self) -> FrameKind {
        self.header.kind()
    }

    /// Requester sequence number.
    pub fn seq(&self) -> u8 {
        self.header.seq()
    }

    /// Completion code of a response. `None` for requests.
    pub fn completion_code(&self) -> Option<u8> {
        match self.kind() {
            FrameKind::Response => self.body.first().copied(),
            FrameKind::Request => None,
        }
    }

    /// Command data: the whole body of a request, the body after the
    /// completion code for a response.
    pub fn data(&self) -> Bytes {
        match self.kind() {
            FrameKind::Request => self.body.clone(),
            FrameKind::Response => self.body.slice(self.body.len().min(1)..),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:#04x}->{:#04x} netfn={:#04x} cmd={:#04x} seq={} [{}]",
            self.kind(),
            self.header.src_addr(),
            self.header.dest_addr(),
            self.header.netfn(),
            self.header.cmd(),
            self.header.seq(),
            hex::encode(&self.body),
        )
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::checksum::{validate_header, validate_trailer};

    fn get_device_id(seq: u8) -> Frame {
        Frame::request(Endpoint::new(0x40), 0x06, Endpoint::new(0x20), seq, 0x01, Bytes::new())
    }

    #[test]
    fn encode_request() {
        let bytes = get_device_id(0).to_bytes().unwrap();
        assert_eq!(&bytes[..], &hex!("40 18 a8 20 00 01 df"));
        assert!(validate_header(&bytes));
        assert!(validate_trailer(&bytes));
    }

    #[test]
    fn decode_request() {
        let frame = Frame::decode(&hex!("20 18 c8 81 08 01 76")).unwrap();
        assert_eq!(frame.kind(), FrameKind::Request);
        assert_eq!(frame.seq(), 2);
        assert_eq!(frame.header().src_addr(), 0x81);
        assert!(frame.body().is_empty());
        assert_eq!(frame.completion_code(), None);
    }

    #[test]
    fn response_swaps_addresses() {
        let request = Frame::request(
            Endpoint::new(0x20),
            0x06,
            Endpoint::with_lun(0x40, 2),
            9,
            0x01,
            Bytes::from_static(&[0xAA]),
        );
        let response = Frame::response_to(&request, 0x00, &[0x01, 0x02]);

        assert_eq!(response.kind(), FrameKind::Response);
        assert_eq!(response.header().dest(), Endpoint::with_lun(0x40, 2));
        assert_eq!(response.header().src(), Endpoint::new(0x20));
        assert_eq!(response.header().netfn(), 0x07);
        assert_eq!(response.seq(), 9);
        assert_eq!(response.header().cmd(), 0x01);
        assert_eq!(response.completion_code(), Some(0x00));
        assert_eq!(&response.data()[..], &[0x01, 0x02]);

        let bytes = response.to_bytes().unwrap();
        assert_eq!(Frame::decode(&bytes).unwrap(), response);
    }

    #[test]
    fn decode_rejects_bad_header() {
        let result = Frame::decode(&hex!("20 18 c9 81 08 01 76"));
        assert_eq!(result, Err(ProtocolError::HeaderChecksum { expected: 0xC8, found: 0xC9 }));
    }

    #[test]
    fn decode_rejects_bad_trailer() {
        let result = Frame::decode(&hex!("20 18 c8 81 08 01 77"));
        assert_eq!(result, Err(ProtocolError::DataChecksum { expected: 0x76, found: 0x77 }));
    }

    #[test]
    fn decode_rejects_truncated_response() {
        // valid header, odd netfn, no completion code
        let result = Frame::decode(&hex!("20 1c c4 40 00 01 bf"));
        assert_eq!(result, Err(ProtocolError::FrameTooShort { expected: 8, actual: 7 }));
    }

    #[test]
    fn oversized_frames_rejected_both_ways() {
        let frame = Frame::request(
            Endpoint::new(0x40),
            0x30,
            Endpoint::new(0x20),
            0,
            0x01,
            vec![0u8; 249],
        );
        assert_eq!(
            frame.to_bytes(),
            Err(ProtocolError::FrameTooLarge { size: 256, max: MAX_FRAME_SIZE })
        );
        assert!(matches!(
            Frame::decode(&[0u8; 256]),
            Err(ProtocolError::FrameTooLarge { size: 256, .. })
        ));
    }

    #[test]
    fn display_is_readable() {
        let text = get_device_id(5).to_string();
        assert_eq!(text, "request 0x20->0x40 netfn=0x06 cmd=0x01 seq=5 []");
    }
}
