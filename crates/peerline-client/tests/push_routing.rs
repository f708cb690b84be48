//! Push router and listener tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use peerline_client::dispatch::{PushHandler, PushListener, PushRouter};
use peerline_client::TransportContext;
use peerline_core::protocol::PushEnvelope;
use peerline_core::Result;

mod util;
use util::test_config;

struct RecordingHandler {
    command: &'static str,
    seen: Arc<Mutex<Vec<PushEnvelope>>>,
}

#[async_trait]
impl PushHandler for RecordingHandler {
    fn command(&self) -> &'static str {
        self.command
    }

    async fn handle(&self, push: PushEnvelope) -> Result<()> {
        self.seen.lock().unwrap().push(push);
        Ok(())
    }
}

#[tokio::test]
async fn dispatch_routes_to_the_registered_handler() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let router = PushRouter::new();
    router.register(Arc::new(RecordingHandler {
        command: "refresh-users",
        seen: Arc::clone(&seen),
    }));

    assert_eq!(router.registered_commands(), vec!["refresh-users"]);

    router
        .dispatch(PushEnvelope {
            command: "refresh-users".into(),
            data: Some(json!({ "users": [] })),
        })
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].command, "refresh-users");
}

#[tokio::test]
async fn unknown_push_command_is_an_error() {
    let router = PushRouter::new();
    let err = router
        .dispatch(PushEnvelope {
            command: "refresh-channels".into(),
            data: None,
        })
        .await
        .expect_err("nothing registered");
    assert_eq!(err.code(), "UNSUPPORTED");
}

#[tokio::test]
async fn listener_drains_pushes_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Sends two pushes, one of them unrecognized, then keeps the socket open.
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        for line in [
            json!({ "command": "refresh-users", "data": { "users": [{ "nombre": "A" }] } }),
            json!({ "command": "refresh-channels", "data": {} }),
            json!({ "command": "refresh-users", "data": { "users": [] } }),
        ] {
            stream
                .write_all(format!("{line}\n").as_bytes())
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let router = Arc::new(PushRouter::new());
    router.register(Arc::new(RecordingHandler {
        command: "refresh-users",
        seen: Arc::clone(&seen),
    }));

    let ctx = Arc::new(TransportContext::connect(&test_config(port)));
    let handle = PushListener::spawn(Arc::clone(&ctx), router, Duration::from_millis(100));

    // Both recognized pushes arrive; the unknown one is logged and skipped.
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if seen.lock().unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener must deliver both recognized pushes");

    ctx.close().await;
    let _ = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("listener must stop once the connection closes");

    server.abort();
}
