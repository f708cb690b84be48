//! Transport strategies.
//!
//! One server, one socket, two ways to hold it:
//! - `EphemeralTransport`: connect, one exchange, close.
//! - `PersistentTransport`: one connection worker owning the socket across
//!   many exchanges, with correlation-id matching and a push channel.
//!
//! Every blocking operation takes an explicit deadline and resolves to a
//! `Timeout` error instead of waiting forever.

use std::time::Duration;

use async_trait::async_trait;

use peerline_core::protocol::{CommandEnvelope, PushEnvelope, ReplyEnvelope};
use peerline_core::Result;

pub mod ephemeral;
pub mod persistent;
mod worker;

pub use ephemeral::EphemeralTransport;
pub use persistent::PersistentTransport;

/// Capability the transport context is polymorphic over.
#[async_trait]
pub trait TransportStrategy: Send + Sync {
    /// Send one command and await its correlated reply.
    async fn send(&self, envelope: CommandEnvelope, deadline: Duration) -> Result<ReplyEnvelope>;

    /// Await the next unsolicited message. Ephemeral transports have no push
    /// channel and return `Unsupported`.
    async fn next_push(&self, deadline: Duration) -> Result<PushEnvelope>;

    /// Tear the connection down. Idempotent; in-flight callers observe
    /// `ConnectionClosed`.
    async fn close(&self);
}
