//! Arbitrary bytes through the frame decoder.
//!
//! Decoding must never panic, and anything it accepts must encode back to
//! the same bytes.

#![no_main]

use ipmb_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let encoded = frame.to_bytes().unwrap();
    assert_eq!(&encoded[..], data);
});
