use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use peerline_core::error::PeerlineError;
use peerline_core::protocol::PushEnvelope;
use peerline_core::Result;

/// A collaborator interested in one push tag.
#[async_trait]
pub trait PushHandler: Send + Sync {
    fn command(&self) -> &'static str;
    async fn handle(&self, push: PushEnvelope) -> Result<()>;
}

/// Registry and dispatcher for push notifications.
#[derive(Default)]
pub struct PushRouter {
    handlers: DashMap<&'static str, Arc<dyn PushHandler>>,
}

impl PushRouter {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    pub fn register(&self, handler: Arc<dyn PushHandler>) {
        self.handlers.insert(handler.command(), handler);
    }

    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|e| *e.key()).collect()
    }

    pub async fn dispatch(&self, push: PushEnvelope) -> Result<()> {
        let command = push.command.clone();
        let handler = self
            .handlers
            .get(command.as_str())
            .ok_or_else(|| PeerlineError::Unsupported(format!("unknown push command: {command}")))?
            .value()
            .clone();
        handler.handle(push).await
    }
}
