//! dubhe client library entry.
//!
//! This crate layers the calling side on top of `dubhe-core`: an async byte
//! transport with frame-level health tracking, the generic-invocation request
//! encoder, YAML configuration, and a JSON renderer for decoded replies. It is
//! intended to be consumed by the binary (`main.rs`) and by integration tests.

pub mod client;
pub mod config;
pub mod render;
pub mod request;
pub mod transport;
