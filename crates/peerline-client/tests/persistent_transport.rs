//! Persistent transport tests against a real local TCP server.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;

use peerline_client::TransportContext;
use peerline_core::protocol::CommandEnvelope;

mod util;
use util::test_config;

#[tokio::test]
async fn sequential_requests_match_their_replies() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Echo server with latency jitter, echoing the correlation id.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let req: serde_json::Value = serde_json::from_str(&line).unwrap();
            let id = req["id"].as_u64().unwrap();
            tokio::time::sleep(Duration::from_millis((id % 3) * 10)).await;
            let reply = json!({
                "status": "success",
                "id": id,
                "message": "ok",
                "data": { "n": req["data"]["n"] },
            });
            write
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .unwrap();
        }
    });

    let ctx = TransportContext::connect(&test_config(port));
    for n in 0..5 {
        let reply = ctx
            .send(
                CommandEnvelope::new("echo", json!({ "n": n })),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.data.unwrap()["n"], n);
    }

    ctx.close().await;
    server.abort();
}

#[tokio::test]
async fn out_of_order_replies_match_by_correlation_id() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Reads two requests, then replies in reverse order.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        let mut requests = Vec::new();
        for _ in 0..2 {
            let line = lines.next_line().await.unwrap().unwrap();
            let req: serde_json::Value = serde_json::from_str(&line).unwrap();
            requests.push(req);
        }
        requests.reverse();
        for req in requests {
            let reply = json!({
                "status": "success",
                "id": req["id"],
                "data": { "n": req["data"]["n"] },
            });
            write
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .unwrap();
        }
    });

    let ctx = TransportContext::connect(&test_config(port));
    let (first, second) = tokio::join!(
        ctx.send(
            CommandEnvelope::new("echo", json!({ "n": 1 })),
            Duration::from_secs(2)
        ),
        ctx.send(
            CommandEnvelope::new("echo", json!({ "n": 2 })),
            Duration::from_secs(2)
        ),
    );

    assert_eq!(first.unwrap().data.unwrap()["n"], 1);
    assert_eq!(second.unwrap().data.unwrap()["n"], 2);

    ctx.close().await;
    server.abort();
}

#[tokio::test]
async fn id_less_replies_match_the_oldest_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Legacy server: replies in order without echoing ids.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let req: serde_json::Value = serde_json::from_str(&line).unwrap();
            let reply = json!({
                "status": "success",
                "data": { "n": req["data"]["n"] },
            });
            write
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .unwrap();
        }
    });

    let ctx = TransportContext::connect(&test_config(port));
    for n in 0..3 {
        let reply = ctx
            .send(
                CommandEnvelope::new("echo", json!({ "n": n })),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(reply.data.unwrap()["n"], n);
    }

    ctx.close().await;
    server.abort();
}

#[tokio::test]
async fn push_reaches_the_listener_and_never_a_sender() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Pushes before the request is even read, then replies to the request.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();

        let push = json!({ "command": "refresh-users", "data": { "users": [] } });
        write
            .write_all(format!("{push}\n").as_bytes())
            .await
            .unwrap();

        let mut lines = BufReader::new(read).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let req: serde_json::Value = serde_json::from_str(&line).unwrap();
        let reply = json!({
            "status": "success",
            "id": req["id"],
            "message": "ok",
            "data": {},
        });
        write
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .unwrap();
    });

    let ctx = TransportContext::connect(&test_config(port));

    // The push arrives first on the wire but must not satisfy this send.
    let reply = ctx
        .send(
            CommandEnvelope::new("list-users", json!({})),
            Duration::from_secs(2),
        )
        .await
        .unwrap();
    assert!(reply.is_success());
    assert_eq!(reply.message.as_deref(), Some("ok"));

    let push = ctx.next_push(Duration::from_secs(2)).await.unwrap();
    assert_eq!(push.command, "refresh-users");

    ctx.close().await;
    server.abort();
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Accepts and reads, never replies.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let _ = lines.next_line().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let ctx = TransportContext::connect(&test_config(port));
    let err = ctx
        .send(
            CommandEnvelope::new("login", json!({})),
            Duration::from_millis(100),
        )
        .await
        .expect_err("must time out");
    assert_eq!(err.code(), "TIMEOUT");

    ctx.close().await;
    server.abort();
}

#[tokio::test]
async fn remote_close_unblocks_blocked_callers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let ctx = TransportContext::connect(&test_config(port));

    // Both calls must resolve within bounded time, not hang.
    let (send_res, push_res) = tokio::join!(
        timeout(
            Duration::from_secs(2),
            ctx.send(CommandEnvelope::new("login", json!({})), Duration::from_secs(30)),
        ),
        timeout(Duration::from_secs(2), ctx.next_push(Duration::from_secs(30))),
    );

    let send_err = send_res.expect("send must unblock").expect_err("no reply possible");
    assert_eq!(send_err.code(), "CONNECTION_CLOSED");
    let push_err = push_res.expect("next_push must unblock").expect_err("no push possible");
    assert_eq!(push_err.code(), "CONNECTION_CLOSED");

    ctx.close().await;
    server.abort();
}

#[tokio::test]
async fn unreachable_server_is_refused() {
    // Grab a free port, then close the listener so nothing is there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let ctx = TransportContext::connect(&test_config(port));
    let err = ctx
        .send(
            CommandEnvelope::new("login", json!({})),
            Duration::from_secs(2),
        )
        .await
        .expect_err("nothing is listening");
    assert_eq!(err.code(), "CONNECTION_REFUSED");

    ctx.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_sticky() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Hold the socket open until the client closes.
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(_)) = lines.next_line().await {}
    });

    let ctx = TransportContext::connect(&test_config(port));
    ctx.close().await;
    ctx.close().await;

    let err = ctx
        .send(
            CommandEnvelope::new("login", json!({})),
            Duration::from_secs(1),
        )
        .await
        .expect_err("closed handle must not send");
    assert_eq!(err.code(), "CONNECTION_CLOSED");

    server.abort();
}
