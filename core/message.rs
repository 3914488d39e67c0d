// Loosely-typed inbound value and envelope shape validation
use crate::error::{Result, TransportError};
use crate::types::{Envelope, Payload};

/// Anything a caller may hand to a transport operation.
///
/// Only `Envelope` is a structured message. The remaining variants are bare
/// primitives, which the transport rejects with a type error unless it is
/// configured to wrap bare text/binary payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Envelope(Envelope),
    Text(String),
    Binary(Vec<u8>),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Envelope(_) => "envelope",
            Message::Text(_) => "text",
            Message::Binary(_) => "binary",
            Message::Number(_) => "number",
            Message::Boolean(_) => "boolean",
            Message::Null => "null",
        }
    }

    pub fn is_envelope(&self) -> bool {
        matches!(self, Message::Envelope(_))
    }

    /// Validate the shape and yield the envelope.
    ///
    /// With `accept_bare` set, bare text and binary values become an
    /// envelope without an id. Numbers, booleans and null never qualify.
    pub fn into_envelope(self, accept_bare: bool) -> Result<Envelope> {
        match self {
            Message::Envelope(env) => Ok(env),
            Message::Text(s) if accept_bare => Ok(Envelope::new(Payload::Text(s))),
            Message::Binary(b) if accept_bare => Ok(Envelope::new(Payload::Binary(b))),
            other => Err(TransportError::InvalidEnvelope { found: other.kind() }),
        }
    }
}

impl From<Envelope> for Message {
    fn from(env: Envelope) -> Self {
        Message::Envelope(env)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<Vec<u8>> for Message {
    fn from(b: Vec<u8>) -> Self {
        Message::Binary(b)
    }
}

impl From<&[u8]> for Message {
    fn from(b: &[u8]) -> Self {
        Message::Binary(b.to_vec())
    }
}

impl From<f64> for Message {
    fn from(n: f64) -> Self {
        Message::Number(n)
    }
}

impl From<bool> for Message {
    fn from(b: bool) -> Self {
        Message::Boolean(b)
    }
}

impl From<()> for Message {
    fn from(_: ()) -> Self {
        Message::Null
    }
}
