//! The envelope: the one message shape exchanged with the editor peer.
//!
//! Every frame on an outbound link carries exactly one envelope, encoded as a
//! JSON object with two fields:
//!
//! ```json
//! {"type":"show-message","content":"Build finished"}
//! {"type":"eval-code","content":"(message \"hi\")"}
//! {"type":"fetch-var","content":"user-full-name"}
//! ```
//!
//! There is no length prefix or binary framing; the WebSocket text frame is
//! the message boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when a payload cannot be read as an [`Envelope`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is valid JSON but not a JSON object.
    #[error("envelope must be a JSON object")]
    NotAnObject,

    /// The payload is not JSON, or the object has an unknown `type`, a missing
    /// field, an extra field or a non-string `content`.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What the editor peer should do with an envelope's `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeKind {
    /// Display `content` as a message.
    #[serde(rename = "show-message")]
    Notify,
    /// Evaluate `content` as code.
    #[serde(rename = "eval-code")]
    Eval,
    /// Reply with the value of the variable named by `content`.
    #[serde(rename = "fetch-var")]
    FetchVar,
}

/// One message to the editor peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Serialized as `"type"`.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Arbitrary text; may be empty.
    pub content: String,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn notify(text: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Notify, text)
    }

    pub fn eval(code: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::Eval, code)
    }

    pub fn fetch_var(name: impl Into<String>) -> Self {
        Self::new(EnvelopeKind::FetchVar, name)
    }

    /// Serializes the envelope into the text of one WebSocket frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if serde_json rejects the value.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses the text of one WebSocket frame.
    ///
    /// The object check comes first: serde would otherwise accept the
    /// sequence form `["fetch-var","x"]` for a struct.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::NotAnObject`] for arrays, strings, numbers, etc.
    /// - [`ProtocolError::Malformed`] for invalid JSON or an object that is not
    ///   exactly `{ "type": <known kind>, "content": <string> }`.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
