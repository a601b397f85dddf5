//! Fuzz harness for whole-log replay: never panics, and live records never
//! outnumber the add lines.

#![no_main]
use libfuzzer_sys::fuzz_target;
use lintodo_core::store::replay;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(state) = replay(text) {
        let adds = text.lines().filter(|l| l.starts_with("add|")).count();
        assert!(state.live.len() <= adds);
    }
});
