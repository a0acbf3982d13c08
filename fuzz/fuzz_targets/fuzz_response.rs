// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use museum_lens::response::ResponseParser;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let result = ResponseParser::parse(&raw);
    // Absent or empty text degrades to the placeholder
    assert!(!result.text.is_empty());
});
