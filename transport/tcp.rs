// TCP channel: send primitive over an optional connected stream
use crate::traits::{complete, write_payload, SendCallback, SendPrimitive};
use freebird_core::{Envelope, TransportError};
use std::cell::RefCell;
use std::io::{Error, ErrorKind, Result};
use std::net::{Shutdown, TcpStream};
use tracing::{debug, warn};

pub struct TcpChannel {
    address: String,
    stream: RefCell<Option<TcpStream>>,
}

impl TcpChannel {
    pub fn new(address: &str) -> Self {
        TcpChannel {
            address: address.to_string(),
            stream: RefCell::new(None),
        }
    }

    /// Wrap an already accepted or connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let address = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        TcpChannel {
            address,
            stream: RefCell::new(Some(stream)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.borrow().is_some()
    }

    pub fn connect(&self) -> Result<()> {
        let stream = TcpStream::connect(&self.address)?;
        stream.set_nodelay(true)?;
        debug!(address = %self.address, "tcp connected");
        *self.stream.borrow_mut() = Some(stream);
        Ok(())
    }

    pub fn disconnect(&self) -> Result<()> {
        if let Some(stream) = self.stream.borrow_mut().take() {
            // Peer may already be gone
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    /// Independent read handle on the same connection, for an `Inbox`.
    pub fn reader(&self) -> Result<TcpStream> {
        match *self.stream.borrow() {
            Some(ref stream) => stream.try_clone(),
            None => Err(Error::new(ErrorKind::NotConnected, "Not connected")),
        }
    }
}

impl SendPrimitive for TcpChannel {
    fn send(&self, envelope: Envelope, callback: Option<SendCallback>) {
        let result = {
            let mut slot = self.stream.borrow_mut();
            let result = match *slot {
                Some(ref mut stream) => write_payload(stream, &envelope.data),
                None => Err(TransportError::no_client()),
            };
            if let Err(TransportError::Io(ref err)) = result {
                warn!(address = %self.address, error = %err, "tcp write failed, dropping stream");
                *slot = None;
            }
            result
        };
        complete(callback, result);
    }
}
