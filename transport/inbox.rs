// Inbox: background stream reader feeding the owning thread through a channel
use crate::config::TransportConfig;
use crate::transport::Transport;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError};
use freebird_core::{Envelope, Result, TransportError};
use std::cell::Cell;
use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

// Back-off for readers on non-blocking sockets
const WOULD_BLOCK_SLEEP: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub enum InboxEvent {
    Data(Vec<u8>),
    Closed,
    Failed(std::io::Error),
}

/// Bytes read on a dedicated thread, delivered on the owner's thread.
///
/// Each read becomes one envelope with a binary payload; chunk boundaries
/// follow the OS reads. At most `inbox_capacity` chunks wait for the owner;
/// beyond that the reader thread blocks and stops reading the stream.
pub struct Inbox {
    rx: Receiver<InboxEvent>,
    closed: Cell<bool>,
}

impl Inbox {
    pub fn spawn<R>(name: &str, mut reader: R, config: &TransportConfig) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = bounded(config.inbox_capacity.max(1));
        let buffer_size = config.read_buffer_size;
        let label = name.to_string();

        thread::Builder::new()
            .name(format!("freebird-rx-{}", name))
            .spawn(move || {
                let mut buf = vec![0u8; buffer_size.max(1)];
                loop {
                    let event = match reader.read(&mut buf) {
                        Ok(0) => InboxEvent::Closed,
                        Ok(n) => InboxEvent::Data(buf[..n].to_vec()),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) if e.kind() == ErrorKind::WouldBlock => {
                            thread::sleep(WOULD_BLOCK_SLEEP);
                            continue;
                        }
                        Err(e) => InboxEvent::Failed(e),
                    };
                    let last = !matches!(event, InboxEvent::Data(_));
                    if tx.send(event).is_err() || last {
                        break;
                    }
                }
                debug!(reader = %label, "reader thread finished");
            })?;

        Ok(Inbox {
            rx,
            closed: Cell::new(false),
        })
    }

    /// Whether the peer closed its side. Data read before the close has
    /// already been delivered by then.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Events read but not yet pumped.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Wait up to `timeout` for data, then deliver everything pending.
    ///
    /// Returns how many chunks were delivered. Fails with `Disconnected`
    /// once the reader is gone and nothing is left, or with the read error
    /// that stopped it.
    pub fn pump<F>(&self, timeout: Duration, mut deliver: F) -> Result<usize>
    where
        F: FnMut(Envelope),
    {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(0),
            Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Disconnected),
        };

        let mut delivered = 0;
        for event in std::iter::once(first).chain(self.rx.try_iter()) {
            match event {
                InboxEvent::Data(bytes) => {
                    trace!(bytes = bytes.len(), "inbox chunk");
                    deliver(Envelope::new(bytes));
                    delivered += 1;
                }
                InboxEvent::Closed => {
                    self.closed.set(true);
                    break;
                }
                InboxEvent::Failed(e) => return Err(e.into()),
            }
        }
        Ok(delivered)
    }

    /// Deliver pending chunks to `transport.receive`.
    pub fn pump_into(&self, transport: &Transport, timeout: Duration) -> Result<usize> {
        self.pump(timeout, |envelope| transport.receive(envelope, None))
    }
}
