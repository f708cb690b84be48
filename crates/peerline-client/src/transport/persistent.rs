//! Persistent transport: one connection worker across many exchanges.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use peerline_core::error::PeerlineError;
use peerline_core::protocol::{encode_command, CommandEnvelope, PushEnvelope, ReplyEnvelope};
use peerline_core::Result;

use crate::config::ClientConfig;
use crate::transport::worker::{self, CloseReason, Outbound};
use crate::transport::TransportStrategy;

/// Keeps one socket open across many request/reply exchanges.
///
/// Construction spawns the connection worker and returns immediately;
/// requests enqueue until the socket opens. Every outbound envelope is
/// stamped with a unique correlation id so concurrent senders and the push
/// listener can share the connection without stealing each other's messages.
pub struct PersistentTransport {
    out_tx: mpsc::Sender<Outbound>,
    push_rx: Mutex<mpsc::Receiver<PushEnvelope>>,
    next_id: AtomicU64,
    shutdown: Arc<Notify>,
    reason: Arc<CloseReason>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PersistentTransport {
    pub fn connect(cfg: &ClientConfig) -> Self {
        let (out_tx, out_rx) = mpsc::channel(cfg.transport.outbound_queue);
        let (push_tx, push_rx) = mpsc::channel(cfg.transport.push_queue);
        let shutdown = Arc::new(Notify::new());
        let reason = Arc::new(CloseReason::default());

        let worker = worker::spawn(
            cfg.server.addr(),
            cfg.transport.connect_timeout(),
            out_rx,
            push_tx,
            Arc::clone(&shutdown),
            Arc::clone(&reason),
        );

        Self {
            out_tx,
            push_rx: Mutex::new(push_rx),
            next_id: AtomicU64::new(1),
            shutdown,
            reason,
            worker: Mutex::new(Some(worker)),
        }
    }
}

#[async_trait]
impl TransportStrategy for PersistentTransport {
    async fn send(&self, mut envelope: CommandEnvelope, deadline: Duration) -> Result<ReplyEnvelope> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        envelope.id = Some(id);
        let line = encode_command(&envelope)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let send_and_wait = async {
            if self
                .out_tx
                .send(Outbound::Request { id, line, reply_tx })
                .await
                .is_err()
            {
                return Err(self.reason.to_error());
            }
            match reply_rx.await {
                Ok(result) => result,
                // Worker dropped the slot without completing it.
                Err(_) => Err(self.reason.to_error()),
            }
        };

        match timeout(deadline, send_and_wait).await {
            Ok(result) => result,
            Err(_) => {
                // Best effort: tell the worker to drop the slot so a late
                // reply is not matched to a caller that already gave up.
                let _ = self.out_tx.try_send(Outbound::Cancel { id });
                Err(PeerlineError::Timeout(deadline))
            }
        }
    }

    async fn next_push(&self, deadline: Duration) -> Result<PushEnvelope> {
        let mut push_rx = self.push_rx.lock().await;
        match timeout(deadline, push_rx.recv()).await {
            Ok(Some(push)) => Ok(push),
            Ok(None) => Err(self.reason.to_error()),
            Err(_) => Err(PeerlineError::Timeout(deadline)),
        }
    }

    async fn close(&self) {
        self.shutdown.notify_one();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
    }
}
