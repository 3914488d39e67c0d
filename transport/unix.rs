// Unix socket channel with socket buffer tuning
use crate::traits::{complete, write_payload, SendCallback, SendPrimitive};
use freebird_core::{Envelope, TransportError};
use nix::sys::socket::{setsockopt, sockopt};
use std::cell::RefCell;
use std::io::{Error, ErrorKind, Result};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct UnixSocketChannel {
    socket_path: PathBuf,
    stream: RefCell<Option<UnixStream>>,
}

impl UnixSocketChannel {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        UnixSocketChannel {
            socket_path: socket_path.as_ref().to_path_buf(),
            stream: RefCell::new(None),
        }
    }

    pub fn from_stream(stream: UnixStream) -> Self {
        let socket_path = stream
            .peer_addr()
            .ok()
            .and_then(|addr| addr.as_pathname().map(Path::to_path_buf))
            .unwrap_or_default();
        UnixSocketChannel {
            socket_path,
            stream: RefCell::new(Some(stream)),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn is_connected(&self) -> bool {
        self.stream.borrow().is_some()
    }

    /// Get raw file descriptor for low-level operations
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.stream.borrow().as_ref().map(|s| s.as_raw_fd())
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        if let Some(ref stream) = *self.stream.borrow() {
            stream.set_nonblocking(nonblocking)?;
        }
        Ok(())
    }

    /// Set socket send buffer size (SO_SNDBUF)
    pub fn set_send_buffer_size(&self, size: usize) -> Result<()> {
        if let Some(ref stream) = *self.stream.borrow() {
            setsockopt(stream, sockopt::SndBuf, &size).map_err(Error::from)?;
        }
        Ok(())
    }

    pub fn connect(&self) -> Result<()> {
        let stream = UnixStream::connect(&self.socket_path)?;
        *self.stream.borrow_mut() = Some(stream);

        // 64KB matches the default read chunk
        if let Err(e) = self.set_send_buffer_size(65536) {
            debug!(error = %e, "could not raise SO_SNDBUF");
        }
        debug!(path = %self.socket_path.display(), "unix socket connected");
        Ok(())
    }

    pub fn disconnect(&self) -> Result<()> {
        self.stream.borrow_mut().take();
        Ok(())
    }

    pub fn reader(&self) -> Result<UnixStream> {
        match *self.stream.borrow() {
            Some(ref stream) => stream.try_clone(),
            None => Err(Error::new(ErrorKind::NotConnected, "Not connected")),
        }
    }
}

impl SendPrimitive for UnixSocketChannel {
    fn send(&self, envelope: Envelope, callback: Option<SendCallback>) {
        let result = {
            let mut slot = self.stream.borrow_mut();
            let result = match *slot {
                Some(ref mut stream) => write_payload(stream, &envelope.data),
                None => Err(TransportError::no_client()),
            };
            if let Err(TransportError::Io(ref err)) = result {
                warn!(path = %self.socket_path.display(), error = %err, "unix write failed, dropping stream");
                *slot = None;
            }
            result
        };
        complete(callback, result);
    }
}
