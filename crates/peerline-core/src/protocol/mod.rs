//! Protocol modules (newline-delimited JSON envelopes).
//!
//! This module hosts the wire contracts of the chat protocol:
//! - `envelope`: command, reply, and push envelope types.
//! - `codec`: line-level encode/decode and inbound classification.
//! - `commands`: command tags and the typed payloads the client ships.
//!
//! All decoding is panic-free: malformed input is reported as
//! `PeerlineError::MalformedEnvelope` instead of indexing into raw strings,
//! keeping the client resilient to whatever the server sends.

pub mod codec;
pub mod commands;
pub mod envelope;

pub use codec::{decode_inbound, encode_command};
pub use envelope::{CommandEnvelope, Inbound, PushEnvelope, ReplyEnvelope, ReplyStatus};
