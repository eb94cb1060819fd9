#![no_main]

use libfuzzer_sys::fuzz_target;
use strace2csv::strace::parse_line;

fuzz_target!(|data: &[u8]| {
    // Any UTF-8 line must parse, skip or error without panicking
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_line(input);
    }
});
