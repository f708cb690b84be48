//! Peerline client library entry.
//!
//! This crate wires the transport strategies, connection worker, transport
//! context, and push demultiplexer into a cohesive client stack. It is
//! consumed by the console binary (`main.rs`) and by integration tests.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod transport;

pub use context::TransportContext;
