//! Conversation client with reconnect-and-replay.
//!
//! The server keeps conversational state only for the lifetime of a socket.
//! Whenever a round trip fails the client drops the socket, and the next
//! attempt opens a fresh one and resends the whole transcript as a single
//! multi-line turn, which rebuilds the server's state before the new turn is
//! answered.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::persona::{compose_persona_turn, PersonaCatalog};
use crate::protocol;
use crate::session::{SessionAction, SessionEvent, SessionState};
use crate::telemetry::TelemetryCollector;
use crate::transcript::Transcript;
use crate::transport::{Connection, Inbound, Transport};

/// One conversation with a chat server.
///
/// `ask` takes `&mut self`, so a client cannot be driven by two callers at
/// once. Wrap it in [`SharedConversationClient`] when it must be shared.
pub struct ConversationClient<T: Transport> {
    config: ClientConfig,
    transport: T,
    connection: Option<T::Connection>,
    state: SessionState,
    transcript: Transcript,
    personas: Option<Arc<PersonaCatalog>>,
    telemetry: Option<TelemetryCollector>,
    id: Uuid,
}

impl<T: Transport> ConversationClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            connection: None,
            state: SessionState::default(),
            transcript: Transcript::default(),
            personas: None,
            telemetry: None,
            id: Uuid::new_v4(),
        }
    }

    /// Use this catalogue for [`set_random_persona`](Self::set_random_persona)
    /// instead of the bundled one.
    pub fn with_persona_catalog(mut self, catalog: Arc<PersonaCatalog>) -> Self {
        self.personas = Some(catalog);
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn conversation_id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, event: SessionEvent) -> SessionAction {
        let (next, action) = self.state.on(event);
        self.state = next;
        action
    }

    fn emit(&self, kind: &str, detail: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(kind, detail);
        }
    }

    /// Open a new connection, replacing any open one.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state.is_closed() {
            return Err(ClientError::ClientClosed);
        }
        if self.connection.is_some() {
            self.close().await;
        }

        let endpoint = self.config.endpoint();
        let connection = self
            .transport
            .open(&endpoint, self.config.receive_timeout())
            .await?;
        info!(conversation = %self.id, %endpoint, "connected to chat server");
        self.emit("connect", json!({ "endpoint": endpoint }));

        self.connection = Some(connection);
        self.apply(SessionEvent::Opened);
        Ok(())
    }

    /// Drop the open connection, if any. Never fails.
    pub async fn close(&mut self) {
        if self.apply(SessionEvent::Close) == SessionAction::CloseSocket {
            self.release_connection().await;
        }
    }

    /// Close the connection and refuse every later operation.
    pub async fn shutdown(&mut self) {
        if self.apply(SessionEvent::Shutdown) == SessionAction::CloseSocket {
            self.release_connection().await;
        }
    }

    async fn release_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.close().await {
                debug!(conversation = %self.id, error = %err, "failed to close connection cleanly");
            }
        }
    }

    /// Prime the server with a persona made of the given trait sentences.
    pub async fn set_personas<S: AsRef<str>>(&mut self, personas: &[S]) -> Result<String> {
        self.ask(compose_persona_turn(personas)).await
    }

    /// Prime the server with a persona picked at random from the catalogue.
    pub async fn set_random_persona(&mut self) -> Result<String> {
        if self.state.is_closed() {
            return Err(ClientError::ClientClosed);
        }
        let traits = match &self.personas {
            Some(catalog) => catalog.pick_random()?.traits().to_vec(),
            None => PersonaCatalog::bundled().pick_random()?.traits().to_vec(),
        };
        self.set_personas(&traits).await
    }

    /// Send one turn and wait for the reply.
    ///
    /// `text` may span several lines to simulate several observations. It is
    /// recorded in the transcript before anything is sent and stays there
    /// even if every attempt fails.
    pub async fn ask(&mut self, text: impl Into<String>) -> Result<String> {
        if self.state.is_closed() {
            return Err(ClientError::ClientClosed);
        }
        let text = text.into();
        self.transcript.push(text.clone());

        let max_attempts = self.config.max_attempts();
        let mut attempt = 1;
        loop {
            let failure = match self.exchange(&text).await {
                Ok(reply) => {
                    self.apply(SessionEvent::Replied);
                    self.transcript.push(reply.clone());
                    self.emit(
                        "reply",
                        json!({ "attempt": attempt, "turns": self.transcript.len() }),
                    );
                    return Ok(reply);
                }
                Err(err) => err,
            };

            if let Some(telemetry) = &self.telemetry {
                telemetry.record_failure("ask", failure.to_string(), attempt);
            }
            if matches!(failure, ClientError::ConnectionClosed)
                && self.apply(SessionEvent::RemoteClosed) == SessionAction::CloseSocket
            {
                self.release_connection().await;
            }

            let final_attempt = attempt >= max_attempts;
            match self.apply(SessionEvent::Failed { final_attempt }) {
                SessionAction::Reconnect => {
                    debug!(
                        conversation = %self.id,
                        attempt,
                        error = %failure,
                        "round trip failed, reconnecting"
                    );
                    self.release_connection().await;
                    attempt += 1;
                }
                _ => return Err(failure),
            }
        }
    }

    /// One attempt: pick what to send, send it, read exactly one reply.
    async fn exchange(&mut self, text: &str) -> Result<String> {
        let outbound = match self.apply(SessionEvent::Ask) {
            SessionAction::ConnectAndReplay => {
                self.connect().await?;
                self.emit("replay", json!({ "turns": self.transcript.len() }));
                self.transcript.replay()
            }
            SessionAction::SendTurn => text.to_owned(),
            SessionAction::Reject => return Err(ClientError::ClientClosed),
            other => {
                return Err(ClientError::Protocol(format!(
                    "unexpected session action {other:?} while asking"
                )))
            }
        };

        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| ClientError::Protocol("no connection after connect".into()))?;
        connection.send(protocol::encode(&outbound)?).await?;
        match connection.receive().await? {
            Inbound::Text(raw) => protocol::decode(&raw),
            Inbound::Closed => Err(ClientError::ConnectionClosed),
            Inbound::Other(description) => Err(ClientError::InvalidMessage(format!(
                "unexpected websocket message received from chat server: {description}"
            ))),
        }
    }
}

/// A client behind an async mutex. The lock is held for the whole of `ask`,
/// retries included, so concurrent callers cannot interleave turns.
pub struct SharedConversationClient<T: Transport> {
    inner: Arc<Mutex<ConversationClient<T>>>,
}

impl<T: Transport> Clone for SharedConversationClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SharedConversationClient<T> {
    pub fn new(client: ConversationClient<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(client)),
        }
    }

    pub async fn ask(&self, text: impl Into<String>) -> Result<String> {
        self.inner.lock().await.ask(text).await
    }

    pub async fn set_personas<S: AsRef<str>>(&self, personas: &[S]) -> Result<String> {
        self.inner.lock().await.set_personas(personas).await
    }

    pub async fn close(&self) {
        self.inner.lock().await.close().await;
    }

    pub async fn shutdown(&self) {
        self.inner.lock().await.shutdown().await;
    }

    /// Snapshot of the transcript.
    pub async fn transcript(&self) -> Transcript {
        self.inner.lock().await.transcript().clone()
    }
}
