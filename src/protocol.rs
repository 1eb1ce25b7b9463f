//! Wire format shared by outbound turns and inbound replies.
//!
//! Both directions carry a JSON object with a single `text` field. Non-ASCII
//! characters are written literally rather than `\u` escaped.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// Serialize one turn into the frame body sent to the server.
pub fn encode(text: &str) -> Result<String> {
    Ok(serde_json::to_string(&TextPayload {
        text: text.to_owned(),
    })?)
}

/// Read the reply out of an inbound text frame.
pub fn decode(raw: &str) -> Result<String> {
    serde_json::from_str::<TextPayload>(raw)
        .map(|payload| payload.text)
        .map_err(|err| {
            ClientError::InvalidMessage(format!("unreadable reply payload `{raw}`: {err}"))
        })
}
