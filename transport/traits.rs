// Send primitive abstraction - allows pluggable communication backends
use freebird_core::{Envelope, Payload, Result};
use std::io::Write;
use std::ops::Deref;
use std::rc::Rc;

/// Completion handler for `send`: bytes written, or the channel's error.
pub type SendCallback = Box<dyn FnOnce(Result<usize>)>;

/// Completion handler for `receive` and `unhandled`.
pub type NotifyCallback = Box<dyn FnOnce(Result<()>)>;

/// The single capability a channel must provide: transmit an envelope and
/// report completion.
///
/// Implementations must invoke `callback` (when present) exactly once, on
/// success or failure. The transport never retries and never calls it
/// itself once the envelope has been handed over. The callback may call
/// straight back into the transport, so implementations must not hold any
/// internal borrow while invoking it.
pub trait SendPrimitive {
    fn send(&self, envelope: Envelope, callback: Option<SendCallback>);
}

impl<F> SendPrimitive for F
where
    F: Fn(Envelope, Option<SendCallback>),
{
    fn send(&self, envelope: Envelope, callback: Option<SendCallback>) {
        self(envelope, callback)
    }
}

/// A primitive that stays reachable after being attached to a transport,
/// so the owner can still connect or disconnect the underlying channel.
pub struct SharedPrimitive<T>(Rc<T>);

impl<T> SharedPrimitive<T> {
    pub fn new(inner: T) -> Self {
        SharedPrimitive(Rc::new(inner))
    }
}

impl<T> Clone for SharedPrimitive<T> {
    fn clone(&self) -> Self {
        SharedPrimitive(Rc::clone(&self.0))
    }
}

impl<T> Deref for SharedPrimitive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: SendPrimitive> SendPrimitive for SharedPrimitive<T> {
    fn send(&self, envelope: Envelope, callback: Option<SendCallback>) {
        self.0.send(envelope, callback)
    }
}

/// Invoke an optional completion handler.
pub fn complete<T>(callback: Option<Box<dyn FnOnce(Result<T>)>>, result: Result<T>) {
    if let Some(callback) = callback {
        callback(result);
    }
}

// Raw payload bytes, no framing
pub(crate) fn write_payload<W: Write>(stream: &mut W, payload: &Payload) -> Result<usize> {
    let bytes = payload.as_bytes();
    stream.write_all(bytes)?;
    stream.flush()?;
    Ok(bytes.len())
}
