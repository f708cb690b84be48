//! Peerline console client.
//!
//! Connects to the configured server over one persistent connection, keeps a
//! push listener running, and turns stdin lines into commands:
//!
//! ```text
//! <command> [json data]
//! login {"email":"a@b.com","password":"x"}
//! list-users
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use peerline_client::config;
use peerline_client::dispatch::{PushHandler, PushListener, PushRouter};
use peerline_client::TransportContext;
use peerline_core::protocol::{commands, CommandEnvelope, PushEnvelope};

/// Logs user-list refresh notifications. A frontend would re-query the user
/// list here instead.
struct RefreshUsersHandler;

#[async_trait]
impl PushHandler for RefreshUsersHandler {
    fn command(&self) -> &'static str {
        commands::REFRESH_USERS
    }

    async fn handle(&self, push: PushEnvelope) -> peerline_core::Result<()> {
        match push.data {
            Some(data) => tracing::info!(%data, "server pushed a user refresh"),
            None => tracing::info!("server pushed a user refresh with no payload"),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "peerline.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");

    tracing::info!(addr = %cfg.server.addr(), "peerline console starting");
    let ctx = Arc::new(TransportContext::connect(&cfg));

    let router = Arc::new(PushRouter::new());
    router.register(Arc::new(RefreshUsersHandler));
    let listener = PushListener::spawn(Arc::clone(&ctx), router, cfg.transport.push_poll());

    println!("connected to {} — '<command> [json data]', ctrl-d to quit", cfg.server.addr());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let data = if rest.is_empty() {
            serde_json::json!({})
        } else {
            match serde_json::from_str(rest) {
                Ok(data) => data,
                Err(e) => {
                    eprintln!("bad json payload: {e}");
                    continue;
                }
            }
        };

        match ctx
            .send(CommandEnvelope::new(command, data), cfg.transport.send_timeout())
            .await
        {
            Ok(reply) => {
                let rendered = serde_json::to_string(&reply).unwrap_or_else(|e| e.to_string());
                println!("{rendered}");
            }
            Err(e) if e.is_terminal() => {
                eprintln!("connection lost: {e}");
                break;
            }
            Err(e) => eprintln!("{}: {e}", e.code()),
        }
    }

    ctx.close().await;
    let _ = listener.await;
}
