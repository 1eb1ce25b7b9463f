use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("connection closed by the server during a round trip")]
    ConnectionClosed,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("no message received within {0:?}")]
    ReceiveTimeout(Duration),

    #[error("client has been shut down")]
    ClientClosed,

    #[error("resource `{0}` not found")]
    ResourceNotFound(String),

    #[error("malformed resource: {0}")]
    Malformed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
