//! Fuzz target: `record_log::decode_frames`
//!
//! The record log is read back after crashes and power loss, so any byte
//! string must decode to some prefix of records without panicking.
//! Re-encoding a decoded record is stable at the byte level.
//!
//! cargo fuzz run fuzz_record_log

#![no_main]

use firewatch::adapters::record_log::{MAX_FRAME_LEN, decode_frames, encode_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for record in decode_frames(data) {
        let frame = encode_frame(&record).expect("decoded record re-encodes");
        assert!(frame.len() <= MAX_FRAME_LEN + 4);
        let again = decode_frames(&frame);
        assert_eq!(again.len(), 1);
        assert_eq!(encode_frame(&again[0]).expect("re-encodes"), frame);
    }
});
