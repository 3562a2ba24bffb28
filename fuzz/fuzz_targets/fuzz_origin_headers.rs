//! Fuzz target: `Host` / `Origin` header handling.

#![no_main]

use libfuzzer_sys::fuzz_target;
use operator_core::OriginValidator;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (host, origin) = text.split_once('\n').unwrap_or((text, ""));
    if let Ok(check) = OriginValidator::default().validate(Some(host), Some(origin)) {
        assert!(check.endpoint.as_str().starts_with("https://api."));
    }
});
