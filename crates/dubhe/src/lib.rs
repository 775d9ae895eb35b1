//! Top-level facade crate for dubhe.
//!
//! Re-exports the protocol core and the client library so users can depend on
//! a single crate.

pub mod core {
    pub use dubhe_core::*;
}

pub mod client {
    pub use dubhe_client::*;
}
