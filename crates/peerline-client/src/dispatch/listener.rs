use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use peerline_core::error::PeerlineError;

use crate::context::TransportContext;
use crate::dispatch::PushRouter;

/// The single long-lived push consumer for a context.
///
/// Loops on `next_push` with a poll deadline, dispatches recognized tags,
/// survives timeouts and handler errors, and stops cleanly when the
/// connection is gone.
pub struct PushListener;

impl PushListener {
    pub fn spawn(
        ctx: Arc<TransportContext>,
        router: Arc<PushRouter>,
        poll: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match ctx.next_push(poll).await {
                    Ok(push) => {
                        let command = push.command.clone();
                        if let Err(e) = router.dispatch(push).await {
                            warn!(command = %command, error = %e, "push not handled");
                        }
                    }
                    Err(PeerlineError::Timeout(_)) => continue,
                    Err(e) if e.is_terminal() => {
                        info!(error = %e, "push listener stopping");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "push receive failed, listener stopping");
                        break;
                    }
                }
            }
        })
    }
}
