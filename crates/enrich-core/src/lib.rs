//! Core types and pure logic for the fragment enrichment engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; the summary and status rules live here so
//! they can be tested without any I/O.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod fragment;
pub mod manifest;
pub mod record;
pub mod status;
pub mod store;
pub mod summary;

pub use error::{Error, Result};
