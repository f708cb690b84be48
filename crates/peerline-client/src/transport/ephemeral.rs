//! Ephemeral transport: one TCP connection per exchange.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use peerline_core::error::PeerlineError;
use peerline_core::protocol::{decode_inbound, encode_command, CommandEnvelope, Inbound,
    PushEnvelope, ReplyEnvelope};
use peerline_core::Result;

use crate::config::ClientConfig;
use crate::transport::TransportStrategy;

/// Opens a socket, writes one line, reads one line, closes. The socket is
/// dropped unconditionally on return, success or failure.
pub struct EphemeralTransport {
    addr: String,
    connect_timeout: Duration,
}

impl EphemeralTransport {
    pub fn new(cfg: &ClientConfig) -> Self {
        Self {
            addr: cfg.server.addr(),
            connect_timeout: cfg.transport.connect_timeout(),
        }
    }

    async fn exchange(&self, line: String) -> Result<ReplyEnvelope> {
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                PeerlineError::ConnectionRefused(format!("{}: connect timed out", self.addr))
            })?
            .map_err(|e| PeerlineError::ConnectionRefused(format!("{}: {e}", self.addr)))?;
        debug!(addr = %self.addr, "ephemeral connection open");

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PeerlineError::ConnectionClosed(format!("write failed: {e}")))?;
        stream
            .write_all(b"\n")
            .await
            .map_err(|e| PeerlineError::ConnectionClosed(format!("write failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| PeerlineError::ConnectionClosed(format!("flush failed: {e}")))?;

        let mut reader = BufReader::new(stream);
        let mut reply_line = String::new();
        let n = reader
            .read_line(&mut reply_line)
            .await
            .map_err(|e| PeerlineError::ConnectionClosed(format!("read failed: {e}")))?;
        if n == 0 {
            return Err(PeerlineError::ConnectionClosed(
                "server closed the connection without replying".into(),
            ));
        }

        match decode_inbound(reply_line.trim_end())? {
            Inbound::Reply(reply) => Ok(reply),
            Inbound::Push(push) => Err(PeerlineError::MalformedEnvelope(format!(
                "expected a reply, got push {:?}",
                push.command
            ))),
        }
    }
}

#[async_trait]
impl TransportStrategy for EphemeralTransport {
    async fn send(&self, envelope: CommandEnvelope, deadline: Duration) -> Result<ReplyEnvelope> {
        let line = encode_command(&envelope)?;
        match timeout(deadline, self.exchange(line)).await {
            Ok(result) => result,
            Err(_) => Err(PeerlineError::Timeout(deadline)),
        }
    }

    async fn next_push(&self, _deadline: Duration) -> Result<PushEnvelope> {
        Err(PeerlineError::Unsupported(
            "ephemeral transport has no push channel".into(),
        ))
    }

    async fn close(&self) {}
}
