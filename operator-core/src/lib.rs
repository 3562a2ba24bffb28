//! Core types for the OBS operator gateway.
//!
//! Derives the target API endpoint for a request and checks the caller's
//! origin against it, resolves the session token, and maps allow-listed
//! routes onto `osc` argument vectors. Nothing in this crate performs I/O.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod command;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod origin;
pub mod route;
pub mod session;

pub use command::{Command, CommandBatch, OSC_PROGRAM};
pub use dispatch::{negotiate_format, resolve, Dispatch, DispatchRequest, PostBody, DEFAULT_SUBMIT_MESSAGE};
pub use error::CoreError;
pub use id::RequestId;
pub use origin::{Endpoint, OriginCheck, OriginDomain, OriginValidator};
pub use route::{GetRoute, Method, PostRoute, QueryParams, RequestPath, Route};
pub use session::{SessionToken, SESSION_COOKIE_NAME};
