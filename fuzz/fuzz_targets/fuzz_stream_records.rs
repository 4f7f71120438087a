#![no_main]

use libfuzzer_sys::fuzz_target;
use lichess_board::protocol::{Board, Event};

fuzz_target!(|data: &[u8]| {
    // Each line is decoded the way the stream decoder does it, as both an
    // event-stream and a board-stream record.
    for line in data.split(|b| *b == b'\n') {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let _ = serde_json::from_slice::<Event>(line);
        let _ = serde_json::from_slice::<Board>(line);
    }
});
