// Core module: Envelope model, validation and errors (NO I/O dependencies)
pub mod types;
pub mod message;
pub mod error;

pub use types::*;
pub use message::*;
pub use error::*;
