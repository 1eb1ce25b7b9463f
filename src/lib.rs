//! Async client for ParlAI-style websocket chat servers.
//!
//! The crate provides:
//! - A `ConversationClient` that keeps a transcript and survives dropped
//!   sockets by reconnecting and replaying the whole conversation.
//! - A `Transport` seam with a websocket implementation and a scripted fake.
//! - A `PersonaCatalog` for priming the remote party with a persona.

mod client;
mod config;
mod error;
mod persona;
mod protocol;
mod scope;
mod session;
mod telemetry;
mod transcript;
mod transport;
#[cfg(feature = "websocket")]
mod websocket;

pub use client::{ConversationClient, SharedConversationClient};
pub use config::{ClientConfig, LoggingConfig, PersonaConfig, Settings};
pub use error::{ClientError, Result};
pub use persona::{
    compose_persona_turn, parse as parse_personas, BundledResources, DirectoryResources, Persona,
    PersonaCatalog, ResourceLoader, PERSONA_LIST, PERSONA_PREFIX,
};
pub use protocol::{decode as decode_reply, encode as encode_turn, TextPayload};
#[cfg(feature = "websocket")]
pub use scope::with_client;
pub use scope::with_client_on;
pub use session::{SessionAction, SessionEvent, SessionState};
pub use telemetry::{init_tracing, FailureRecord, TelemetryCollector, TelemetryEvent};
pub use transcript::Transcript;
pub use transport::{Connection, Inbound, ScriptedConnection, ScriptedTransport, Transport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};
