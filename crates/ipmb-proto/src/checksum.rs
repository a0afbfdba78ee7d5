//! Two's-complement checksums used by both halves of a frame.
//!
//! A region is valid when its bytes plus the checksum byte sum to zero
//! modulo 256.

/// Length of the connection header covered by the header checksum.
const HEADER_CHECKED: usize = 2;

/// Offset of the first byte covered by the data checksum.
const DATA_START: usize = 3;

/// Additive checksum negated modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)).wrapping_neg()
}

/// Check the header checksum (byte 2) against bytes 0 and 1.
///
/// Buffers shorter than three bytes never validate.
pub fn validate_header(frame: &[u8]) -> bool {
    frame.len() > HEADER_CHECKED && checksum(&frame[..HEADER_CHECKED]) == frame[HEADER_CHECKED]
}

/// Check the trailing data checksum against everything between the header
/// checksum and the last byte.
pub fn validate_trailer(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((last, rest)) if rest.len() >= DATA_START => checksum(&rest[DATA_START..]) == *last,
        _ => false,
    }
}
