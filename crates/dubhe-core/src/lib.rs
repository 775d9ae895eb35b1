//! dubhe core: wire envelope codec, Hessian 2.0 decoder, and error types.
//!
//! This crate defines the protocol-level contracts shared by the client and
//! tooling: the fixed 16-byte envelope framing, the byte-tag-driven Hessian 2.0
//! object-graph decoder, the serialization-id registry, and the response
//! classifier. It intentionally carries no transport or runtime dependencies so
//! decoding can be exercised and fuzzed in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `DubheError`/`Result` so a malformed
//! payload can never take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod hessian;
pub mod naming;
pub mod protocol;
pub mod registry;
pub mod reply;

/// Shared result type.
pub use error::{DubheError, ProtocolError, RemoteError, Result};
