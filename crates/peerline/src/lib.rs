//! Top-level facade crate for peerline.
//!
//! Re-exports the protocol core and the client stack so users can depend on a
//! single crate.

pub mod core {
    pub use peerline_core::*;
}

pub mod client {
    pub use peerline_client::*;
}
