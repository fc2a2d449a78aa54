//! Fuzz harness for `canonicalize_json`.
//!
//! The canonicalizer must never panic, and whatever it accepts must already
//! be a fixed point: canonicalizing the output again yields the same bytes.

#![no_main]
use libfuzzer_sys::fuzz_target;
use qs_gate::determinism::{canonicalize_json, is_canonical};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(canonical) = canonicalize_json(input) {
        assert_eq!(canonicalize_json(&canonical).as_deref(), Ok(canonical.as_str()));
        assert!(is_canonical(&canonical));
    }
});
