//! Fuzz target for the stream parser's resynchronization.
//!
//! The parser must never panic on arbitrary byte streams, must never grow
//! its drop counter past the number of bytes fed, and pop_one must always
//! terminate (no infinite resync loop).

#![no_main]

use libfuzzer_sys::fuzz_target;
use nodelink_core::StreamParser;

fuzz_target!(|data: &[u8]| {
    let mut parser = StreamParser::new(4096, Some(2));
    parser.feed(data);

    let total_fed = data.len() as u64;
    let mut iterations = 0usize;
    while let Some(frame) = parser.pop_one() {
        let _ = frame.payload.len();
        iterations += 1;
        if iterations > data.len() + 1 {
            panic!("pop_one did not terminate");
        }
    }

    assert!(parser.drop_bytes() <= total_fed);
});
