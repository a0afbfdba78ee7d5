//! Arbitrary bytes through header repair.
//!
//! A repaired header always validates, and repairing it again is a no-op.

#![no_main]

use ipmb_proto::{repair_header, validate_header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&local_addr, raw)) = data.split_first() else {
        return;
    };
    let Ok(outcome) = repair_header(raw, local_addr) else {
        return;
    };

    assert!(validate_header(&outcome.bytes));
    let again = repair_header(&outcome.bytes, local_addr).unwrap();
    assert_eq!(again.strategy, None);
    assert_eq!(again.bytes, outcome.bytes);
});
