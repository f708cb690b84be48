//! Connection worker: the single owner of the live socket.
//!
//! One task, one `select!` loop: drains the outbound queue to the socket
//! (newline-terminated, flushed per line) and demultiplexes inbound lines
//! into per-request completion slots or the push channel. In-flight state is
//! worker-local; callers only ever touch the queues.
//!
//! Lifecycle: Connecting -> Open -> Closed. Any I/O error, EOF, or local
//! close request is terminal; the close reason is recorded once and every
//! blocked caller receives it. No automatic reconnect.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use peerline_core::error::PeerlineError;
use peerline_core::protocol::{decode_inbound, Inbound, PushEnvelope, ReplyEnvelope};
use peerline_core::Result;

/// Messages the persistent strategy hands to the worker.
pub(crate) enum Outbound {
    Request {
        id: u64,
        line: String,
        reply_tx: oneshot::Sender<Result<ReplyEnvelope>>,
    },
    /// The caller's deadline expired; drop the request's completion slot.
    Cancel { id: u64 },
}

/// Why the connection went away. Recorded exactly once by the worker and
/// read by every caller that finds the connection gone.
#[derive(Default)]
pub(crate) struct CloseReason {
    slot: Mutex<Option<PeerlineError>>,
}

impl CloseReason {
    fn record(&self, err: PeerlineError) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn to_error(&self) -> PeerlineError {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| PeerlineError::ConnectionClosed("connection is down".into()))
    }
}

pub(crate) fn spawn(
    addr: String,
    connect_timeout: Duration,
    out_rx: mpsc::Receiver<Outbound>,
    push_tx: mpsc::Sender<PushEnvelope>,
    shutdown: Arc<Notify>,
    reason: Arc<CloseReason>,
) -> JoinHandle<()> {
    tokio::spawn(run(addr, connect_timeout, out_rx, push_tx, shutdown, reason))
}

async fn run(
    addr: String,
    connect_timeout: Duration,
    mut out_rx: mpsc::Receiver<Outbound>,
    push_tx: mpsc::Sender<PushEnvelope>,
    shutdown: Arc<Notify>,
    reason: Arc<CloseReason>,
) {
    info!(%addr, "connecting");
    let stream = tokio::select! {
        _ = shutdown.notified() => {
            reason.record(PeerlineError::ConnectionClosed("closed before connecting".into()));
            fail_queued(&mut out_rx, &reason).await;
            return;
        }
        connected = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr)) => {
            match connected {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    reason.record(PeerlineError::ConnectionRefused(format!("{addr}: {e}")));
                    fail_queued(&mut out_rx, &reason).await;
                    return;
                }
                Err(_) => {
                    reason.record(PeerlineError::ConnectionRefused(format!(
                        "{addr}: connect timed out"
                    )));
                    fail_queued(&mut out_rx, &reason).await;
                    return;
                }
            }
        }
    };
    info!(%addr, "connection open");

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // In-flight completion slots, keyed by correlation id, plus send order
    // for matching replies that carry no id.
    let mut pending: HashMap<u64, oneshot::Sender<Result<ReplyEnvelope>>> = HashMap::new();
    let mut order: VecDeque<u64> = VecDeque::new();

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                reason.record(PeerlineError::ConnectionClosed("closed by caller".into()));
                break;
            }

            outbound = out_rx.recv() => match outbound {
                Some(Outbound::Request { id, line, reply_tx }) => {
                    // Register before writing so a fast reply cannot race the slot.
                    pending.insert(id, reply_tx);
                    order.push_back(id);
                    if let Err(e) = write_line(&mut write_half, &line).await {
                        reason.record(PeerlineError::ConnectionClosed(format!("write failed: {e}")));
                        break;
                    }
                }
                Some(Outbound::Cancel { id }) => {
                    pending.remove(&id);
                }
                None => {
                    reason.record(PeerlineError::ConnectionClosed("transport handle dropped".into()));
                    break;
                }
            },

            inbound = lines.next_line() => match inbound {
                Ok(Some(line)) => route_line(&line, &mut pending, &mut order, &push_tx),
                Ok(None) => {
                    reason.record(PeerlineError::ConnectionClosed("server closed the connection".into()));
                    break;
                }
                Err(e) => {
                    reason.record(PeerlineError::ConnectionClosed(format!("read failed: {e}")));
                    break;
                }
            },
        }
    }

    let err = reason.to_error();
    info!(error = %err, "connection worker stopping");
    for (_, reply_tx) in pending.drain() {
        let _ = reply_tx.send(Err(err.clone()));
    }
    fail_queued(&mut out_rx, &reason).await;
    // push_tx drops here, so blocked next_push callers observe the close.
}

async fn write_line(write_half: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    write_half.write_all(line.as_bytes()).await?;
    write_half.write_all(b"\n").await?;
    write_half.flush().await
}

/// Demultiplex one received line.
///
/// Replies echoing a known correlation id complete their slot; replies with
/// no id complete the oldest in-flight request (the socket is FIFO, so an
/// in-order server without id support still matches correctly). Everything
/// else is push traffic. Malformed lines and unmatched replies are logged
/// and dropped, never fatal.
fn route_line(
    line: &str,
    pending: &mut HashMap<u64, oneshot::Sender<Result<ReplyEnvelope>>>,
    order: &mut VecDeque<u64>,
    push_tx: &mpsc::Sender<PushEnvelope>,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match decode_inbound(line) {
        Ok(Inbound::Reply(reply)) => {
            let slot = match reply.id {
                Some(id) => pending.remove(&id),
                None => oldest_pending(pending, order),
            };
            drain_completed(pending, order);
            match slot {
                Some(reply_tx) => {
                    // The caller may have timed out and gone; that is fine.
                    let _ = reply_tx.send(Ok(reply));
                }
                None => warn!(id = ?reply.id, "reply matches no in-flight request, dropping"),
            }
        }
        Ok(Inbound::Push(push)) => {
            if let Err(e) = push_tx.try_send(push) {
                match e {
                    mpsc::error::TrySendError::Full(push) => {
                        warn!(command = %push.command, "push queue full, dropping push");
                    }
                    mpsc::error::TrySendError::Closed(push) => {
                        debug!(command = %push.command, "no push consumer, dropping push");
                    }
                }
            }
        }
        Err(e) => warn!(error = %e, "dropping malformed line"),
    }
}

/// Pop the oldest id that still has a live slot. Ids already completed or
/// cancelled linger in `order` until skipped here.
fn oldest_pending(
    pending: &mut HashMap<u64, oneshot::Sender<Result<ReplyEnvelope>>>,
    order: &mut VecDeque<u64>,
) -> Option<oneshot::Sender<Result<ReplyEnvelope>>> {
    while let Some(id) = order.pop_front() {
        if let Some(reply_tx) = pending.remove(&id) {
            return Some(reply_tx);
        }
    }
    None
}

/// Drop leading `order` entries whose slot is gone, so id-matched completions
/// do not leave the queue growing for the life of the connection.
fn drain_completed(
    pending: &HashMap<u64, oneshot::Sender<Result<ReplyEnvelope>>>,
    order: &mut VecDeque<u64>,
) {
    while let Some(&id) = order.front() {
        if pending.contains_key(&id) {
            break;
        }
        order.pop_front();
    }
}

/// Fail every request still sitting in the outbound queue with the recorded
/// close reason, so no caller is left waiting on a connection that is gone.
async fn fail_queued(out_rx: &mut mpsc::Receiver<Outbound>, reason: &CloseReason) {
    out_rx.close();
    let err = reason.to_error();
    while let Some(outbound) = out_rx.recv().await {
        if let Outbound::Request { reply_tx, .. } = outbound {
            let _ = reply_tx.send(Err(err.clone()));
        }
    }
}
