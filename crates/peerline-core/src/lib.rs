//! Peerline core: wire-level protocol contracts and the shared error surface.
//!
//! This crate defines the envelope types, the line codec, and the error type
//! shared by the transport stack and its callers. It intentionally carries no
//! transport or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PeerlineError`/`Result` so malformed
//! server traffic can never crash a client process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{PeerlineError, Result};
