//! Reconnect-and-replay against a real websocket server on localhost.
#![cfg(feature = "websocket")]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parlai_client::{with_client, ClientConfig, ClientError, ConversationClient, WebSocketTransport};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Clone, Copy, PartialEq)]
enum Behaviour {
    Echo,
    /// Close the first connection right after its first reply.
    DropFirst,
    /// Never answer on the first connection.
    SilentFirst,
}

/// Starts a server that answers `{"text": "echo <conn>: <text>"}` and
/// reports every received turn together with its connection index.
async fn spawn_server(behaviour: Behaviour) -> (String, mpsc::UnboundedReceiver<(usize, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut next_conn = 0;
        while let Ok((stream, _)) = listener.accept().await {
            let conn = next_conn;
            next_conn += 1;
            let seen = seen_tx.clone();
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(raw) = message else {
                        continue;
                    };
                    let payload: serde_json::Value = serde_json::from_str(&raw).unwrap();
                    let text = payload["text"].as_str().unwrap().to_owned();
                    let _ = seen.send((conn, text.clone()));

                    if conn == 0 && behaviour == Behaviour::SilentFirst {
                        continue;
                    }
                    let reply = serde_json::json!({ "text": format!("echo {conn}: {text}") });
                    ws.send(Message::Text(reply.to_string())).await.unwrap();
                    if conn == 0 && behaviour == Behaviour::DropFirst {
                        let _ = ws.close(None).await;
                        return;
                    }
                }
            });
        }
    });

    (format!("ws://{addr}"), seen_rx)
}

fn drain(seen: &mut mpsc::UnboundedReceiver<(usize, String)>) -> Vec<(usize, String)> {
    let mut turns = Vec::new();
    while let Ok(turn) = seen.try_recv() {
        turns.push(turn);
    }
    turns
}

fn config(host: &str) -> ClientConfig {
    ClientConfig::new(host).with_receive_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn steady_connection_sends_single_turns() {
    let (host, mut seen) = spawn_server(Behaviour::Echo).await;
    let mut client = ConversationClient::new(config(&host), WebSocketTransport::new());

    assert_eq!(client.ask("hi").await.unwrap(), "echo 0: hi");
    assert_eq!(client.ask("привет").await.unwrap(), "echo 0: привет");
    client.shutdown().await;

    assert_eq!(
        drain(&mut seen),
        vec![(0, "hi".to_string()), (0, "привет".to_string())]
    );
}

#[tokio::test]
async fn dropped_connection_is_rebuilt_by_replay() {
    let (host, mut seen) = spawn_server(Behaviour::DropFirst).await;
    let mut client = ConversationClient::new(config(&host), WebSocketTransport::new());

    assert_eq!(client.ask("hi").await.unwrap(), "echo 0: hi");
    let reply = client.ask("still there?").await.unwrap();
    client.shutdown().await;

    assert_eq!(reply, "echo 1: hi\necho 0: hi\nstill there?");
    let turns = drain(&mut seen);
    assert_eq!(turns.first(), Some(&(0, "hi".to_string())));
    assert_eq!(
        turns.last(),
        Some(&(1, "hi\necho 0: hi\nstill there?".to_string()))
    );
}

#[tokio::test]
async fn silent_server_times_out_and_retries() {
    let (host, mut seen) = spawn_server(Behaviour::SilentFirst).await;
    let mut client = ConversationClient::new(
        ClientConfig::new(host).with_receive_timeout(Duration::from_secs(1)),
        WebSocketTransport::new(),
    );

    let reply = client.ask("hello?").await.unwrap();
    client.shutdown().await;

    assert_eq!(reply, "echo 1: hello?");
    assert_eq!(
        drain(&mut seen),
        vec![(0, "hello?".to_string()), (1, "hello?".to_string())]
    );
}

#[tokio::test]
async fn unreachable_host_fails_after_retries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client =
        ConversationClient::new(config(&format!("ws://{addr}")), WebSocketTransport::new());
    let err = client.ask("hi").await.unwrap_err();

    assert!(matches!(err, ClientError::Connection(_)));
    assert_eq!(client.transcript().turns(), ["hi"]);
}

#[tokio::test]
async fn scoped_helper_talks_to_server() {
    let (host, _seen) = spawn_server(Behaviour::Echo).await;

    let reply = with_client(config(&host), |client| {
        Box::pin(async move { client.ask("ping").await })
    })
    .await
    .unwrap();

    assert_eq!(reply, "echo 0: ping");
}
