//! Fuzz harness for the `.lint-todo` line parser.
//!
//! Any line that parses as an entry must re-serialize to a line that parses
//! back to the same record.

#![no_main]
use libfuzzer_sys::fuzz_target;
use lintodo_core::store::line::{ParsedLine, parse_line, to_line};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(ParsedLine::Entry(op, record)) = parse_line(text) else {
        return;
    };
    let Ok(encoded) = to_line(op, &record) else {
        return;
    };
    match parse_line(&encoded) {
        Ok(ParsedLine::Entry(op2, record2)) => {
            assert_eq!(op, op2);
            assert_eq!(record, record2);
        }
        other => panic!("re-encoded line failed to parse: {other:?}"),
    }
});
