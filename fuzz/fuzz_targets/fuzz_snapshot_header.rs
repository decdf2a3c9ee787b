//! Fuzz target for snapshot header decoding.
//!
//! Tests that arbitrary byte sequences cannot cause panics or oversized
//! allocations when parsed as a state snapshot header.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ml_state::state::persist::decode_header;

fuzz_target!(|data: &[u8]| {
    if let Ok((_, consumed)) = decode_header(data) {
        assert!(consumed <= data.len());
    }
});
