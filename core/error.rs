// Error kinds surfaced through transport callbacks
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// A bare value was passed where an envelope is required.
    #[error("type error: expected a message envelope, found {found}")]
    InvalidEnvelope { found: &'static str },

    #[error("{0}")]
    NotConnected(String),

    #[error("channel closed")]
    Disconnected,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TransportError {
    pub fn no_client() -> Self {
        TransportError::NotConnected("No client connected".to_string())
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, TransportError::InvalidEnvelope { .. })
    }
}
