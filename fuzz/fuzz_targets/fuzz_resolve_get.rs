//! Fuzz target: GET path resolution.
//!
//! Arbitrary paths must either resolve or be rejected; they must never
//! panic, and every resolved command must start with `osc`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use operator_core::{resolve, Dispatch, DispatchRequest, Method, PostBody, QueryParams, RequestPath};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (path, accept) = text.split_once('\n').unwrap_or((text, ""));
    let path = RequestPath::parse(path);
    let query = QueryParams::default();
    let body = PostBody::empty();
    let request = DispatchRequest { path: &path, query: &query, accept: Some(accept), body: &body };
    if let Ok(Dispatch::Single(command)) = resolve(Method::Get, request) {
        assert_eq!(command.program(), Some("osc"));
    }
});
