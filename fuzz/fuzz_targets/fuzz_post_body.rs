//! Fuzz target: POST body parsing and staging fan-out.
//!
//! Verifies that arbitrary byte sequences fed to the body parser and the
//! `staging/select` handler never cause panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use operator_core::{resolve, DispatchRequest, Method, PostBody, QueryParams, RequestPath};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = PostBody::parse(data) else {
        return;
    };
    let _ = body.user();
    let path = RequestPath::parse("/staging/select");
    let query = QueryParams::default();
    let request = DispatchRequest { path: &path, query: &query, accept: None, body: &body };
    if let Ok(dispatch) = resolve(Method::Post, request) {
        for command in dispatch.into_batch() {
            assert!(command.argv().len() >= 5);
        }
    }
});
