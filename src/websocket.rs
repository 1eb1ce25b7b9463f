//! Websocket transport backed by `tokio-tungstenite`.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{ClientError, Result};
use crate::transport::{Connection, Inbound, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens plain websocket connections. The handshake shares the receive
/// timeout so an unreachable host cannot stall an attempt indefinitely.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn open(&self, endpoint: &str, receive_timeout: Duration) -> Result<WebSocketConnection> {
        let (stream, _response) = timeout(receive_timeout, connect_async(endpoint))
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "handshake with {endpoint} timed out after {receive_timeout:?}"
                ))
            })?
            .map_err(|err| ClientError::Connection(format!("cannot connect to {endpoint}: {err}")))?;

        Ok(WebSocketConnection {
            stream,
            receive_timeout,
        })
    }
}

pub struct WebSocketConnection {
    stream: WsStream,
    receive_timeout: Duration,
}

impl WebSocketConnection {
    async fn next_data_message(&mut self) -> Result<Inbound> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(Inbound::Closed),
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Ok(Inbound::Closed)
                }
                Some(Err(err)) => {
                    return Err(ClientError::Connection(format!("websocket receive failed: {err}")))
                }
            };

            match message {
                Message::Text(text) => return Ok(Inbound::Text(text)),
                Message::Close(_) => return Ok(Inbound::Closed),
                // tungstenite answers pings on its own
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Binary(data) => {
                    return Ok(Inbound::Other(format!(
                        "binary frame of {} bytes",
                        data.len()
                    )))
                }
                Message::Frame(_) => return Ok(Inbound::Other("raw frame".into())),
            }
        }
    }
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send(&mut self, frame: String) -> Result<()> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|err| match err {
                WsError::ConnectionClosed | WsError::AlreadyClosed => ClientError::ConnectionClosed,
                other => ClientError::Connection(format!("websocket send failed: {other}")),
            })
    }

    async fn receive(&mut self) -> Result<Inbound> {
        let limit = self.receive_timeout;
        timeout(limit, self.next_data_message())
            .await
            .map_err(|_| ClientError::ReceiveTimeout(limit))?
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(ClientError::Connection(format!(
                "websocket close failed: {err}"
            ))),
        }
    }
}
