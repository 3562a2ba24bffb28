//! HTTP gateway between the staging dashboard and the `osc` client.
//!
//! Accepts cookie-authenticated browser requests, checks their origin,
//! writes a throwaway `osc` config and cookie jar for the caller's session,
//! and returns the output of the mapped `osc` command(s) as plain text.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod context;
pub mod error;
pub mod routes;
