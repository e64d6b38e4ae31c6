#![no_main]

use libfuzzer_sys::fuzz_target;
use minefield_core::{ExecutionRecord, parse_log};

fuzz_target!(|data: &[u8]| {
    // Result segments are read back as UTF-8 text
    if let Ok(s) = std::str::from_utf8(data) {
        let parsed = parse_log(s);
        // Every accepted record must survive a write/read cycle unchanged
        for record in &parsed.records {
            let line = record.to_line();
            assert_eq!(ExecutionRecord::parse_line(&line).as_ref(), Ok(record));
        }
    }
});
