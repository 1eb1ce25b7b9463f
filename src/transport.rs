use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientError, Result};
use crate::protocol;

/// One message pulled off a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text frame carrying a JSON payload.
    Text(String),
    /// The remote side closed the connection.
    Closed,
    /// Anything else; holds a description for diagnostics.
    Other(String),
}

/// Opens duplex connections to a chat server.
#[async_trait]
pub trait Transport: Send + Sync {
    type Connection: Connection;

    async fn open(&self, endpoint: &str, receive_timeout: Duration) -> Result<Self::Connection>;
}

/// A single open socket. One `send` is answered by one `receive`.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, frame: String) -> Result<()>;
    async fn receive(&mut self) -> Result<Inbound>;
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug)]
enum ReceiveStep {
    Frame(Inbound),
    Fail(ClientError),
}

#[derive(Debug, Default)]
struct Script {
    refusals: usize,
    inbound: VecDeque<ReceiveStep>,
    connect_attempts: usize,
    opened: usize,
    closes: usize,
    sent: Vec<String>,
    endpoints: Vec<String>,
}

/// In-memory transport whose behaviour is scripted up front.
///
/// Connects succeed unless a refusal is queued. Each `receive` pops the next
/// scripted frame or error; an empty queue yields an `InvalidMessage` error.
/// Clones share the same script, so a test can keep one handle for
/// inspection while the client owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("scripted transport poisoned")
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_connects(self, count: usize) -> Self {
        self.script().refusals += count;
        self
    }

    /// Queue a well-formed reply.
    pub fn reply(self, text: &str) -> Self {
        let frame = serde_json::json!({ "text": text }).to_string();
        self.inbound(Inbound::Text(frame))
    }

    /// Queue a raw inbound message.
    pub fn inbound(self, message: Inbound) -> Self {
        self.script()
            .inbound
            .push_back(ReceiveStep::Frame(message));
        self
    }

    /// Queue a receive failure, e.g. a timeout.
    pub fn receive_error(self, error: ClientError) -> Self {
        self.script().inbound.push_back(ReceiveStep::Fail(error));
        self
    }

    pub fn connect_attempts(&self) -> usize {
        self.script().connect_attempts
    }

    pub fn connections_opened(&self) -> usize {
        self.script().opened
    }

    pub fn closes(&self) -> usize {
        self.script().closes
    }

    /// Raw frames written by the client, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        self.script().sent.clone()
    }

    /// The `text` field of every frame written by the client.
    pub fn sent_turns(&self) -> Vec<String> {
        self.sent_frames()
            .iter()
            .filter_map(|frame| protocol::decode(frame).ok())
            .collect()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.script().endpoints.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn open(&self, endpoint: &str, _receive_timeout: Duration) -> Result<ScriptedConnection> {
        let mut script = self.script();
        script.connect_attempts += 1;
        script.endpoints.push(endpoint.to_owned());
        if script.refusals > 0 {
            script.refusals -= 1;
            return Err(ClientError::Connection(format!(
                "cannot reach {endpoint}: connection refused"
            )));
        }
        script.opened += 1;
        Ok(ScriptedConnection {
            script: Arc::clone(&self.script),
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
    open: bool,
}

impl ScriptedConnection {
    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("scripted transport poisoned")
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&mut self, frame: String) -> Result<()> {
        if !self.open {
            return Err(ClientError::ConnectionClosed);
        }
        self.script().sent.push(frame);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Inbound> {
        if !self.open {
            return Ok(Inbound::Closed);
        }
        match self.script().inbound.pop_front() {
            Some(ReceiveStep::Frame(message)) => Ok(message),
            Some(ReceiveStep::Fail(error)) => Err(error),
            None => Err(ClientError::InvalidMessage(
                "scripted transport ran out of inbound frames".into(),
            )),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.script().closes += 1;
        }
        Ok(())
    }
}
