//! Transport context: the façade callers hold.
//!
//! Owns the installed strategy and delegates to it. There is no process-wide
//! connection singleton; whoever needs the connection is handed a context.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use peerline_core::protocol::{CommandEnvelope, PushEnvelope, ReplyEnvelope};
use peerline_core::Result;

use crate::config::ClientConfig;
use crate::transport::{EphemeralTransport, PersistentTransport, TransportStrategy};

pub struct TransportContext {
    strategy: RwLock<Arc<dyn TransportStrategy>>,
}

impl TransportContext {
    /// Persistent context: spawns the connection worker and returns
    /// immediately. Requests enqueue until the socket opens.
    pub fn connect(cfg: &ClientConfig) -> Self {
        Self::with_strategy(Arc::new(PersistentTransport::connect(cfg)))
    }

    /// One connection per exchange, no push channel.
    pub fn ephemeral(cfg: &ClientConfig) -> Self {
        Self::with_strategy(Arc::new(EphemeralTransport::new(cfg)))
    }

    pub fn with_strategy(strategy: Arc<dyn TransportStrategy>) -> Self {
        Self {
            strategy: RwLock::new(strategy),
        }
    }

    /// Swap the installed strategy. In-flight calls finish on the old one.
    pub fn set_strategy(&self, strategy: Arc<dyn TransportStrategy>) {
        *self
            .strategy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = strategy;
    }

    fn strategy(&self) -> Arc<dyn TransportStrategy> {
        Arc::clone(&self.strategy.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Send one command and await its correlated reply.
    pub async fn send(&self, envelope: CommandEnvelope, deadline: Duration) -> Result<ReplyEnvelope> {
        self.strategy().send(envelope, deadline).await
    }

    /// Await the next unsolicited message. Intended to be called from one
    /// long-lived listener per context.
    pub async fn next_push(&self, deadline: Duration) -> Result<PushEnvelope> {
        self.strategy().next_push(deadline).await
    }

    pub async fn close(&self) {
        self.strategy().close().await;
    }
}
