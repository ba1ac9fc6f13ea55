#![no_main]

use libfuzzer_sys::fuzz_target;
use tranche_sequencer::{decode_payload, encode_payload};

// Decoding arbitrary bytes never panics, and anything accepted re-encodes
// to the exact input.
fuzz_target!(|data: &[u8]| {
    if let Ok(record) = decode_payload(data) {
        assert_eq!(&encode_payload(&record)[..], data);
    }
});
