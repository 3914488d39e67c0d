// Transport: uniform send/receive surface over a pluggable send primitive
use crate::config::TransportConfig;
use crate::listeners::{Event, ListenerId, Listeners};
use crate::scheduler::Scheduler;
use crate::traits::{NotifyCallback, SendCallback, SendPrimitive};
use freebird_core::{Envelope, Message, Result, TransportError};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Wraps a channel's send primitive with envelope validation and deferred
/// listener notification.
///
/// The primitive may be attached after construction. Everything visible to
/// listeners happens on a later turn of the scheduler, never inside the call
/// that caused it.
///
/// A `Transport` belongs to one thread. No internal borrow is held while the
/// send primitive runs, so send callbacks may use the transport again.
pub struct Transport {
    primitive: RefCell<Option<Rc<dyn SendPrimitive>>>,
    listeners: Rc<RefCell<Listeners>>,
    scheduler: Rc<dyn Scheduler>,
    config: TransportConfig,
}

impl Transport {
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::with_config(scheduler, TransportConfig::default())
    }

    pub fn with_config(scheduler: impl Scheduler + 'static, config: TransportConfig) -> Self {
        Transport {
            primitive: RefCell::new(None),
            listeners: Rc::new(RefCell::new(Listeners::new())),
            scheduler: Rc::new(scheduler),
            config,
        }
    }

    /// Attach (or replace) the channel's send primitive.
    pub fn attach(&self, primitive: impl SendPrimitive + 'static) {
        *self.primitive.borrow_mut() = Some(Rc::new(primitive));
    }

    pub fn with_primitive(self, primitive: impl SendPrimitive + 'static) -> Self {
        self.attach(primitive);
        self
    }

    pub fn has_primitive(&self) -> bool {
        self.primitive.borrow().is_some()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Hand a message to the channel.
    ///
    /// An invalid message never reaches the primitive; the callback gets the
    /// type error on the next tick instead.
    ///
    /// # Panics
    ///
    /// Panics if no send primitive was attached, whatever the message. That
    /// is an incompletely assembled transport, not a runtime condition.
    pub fn send(&self, msg: impl Into<Message>, callback: Option<SendCallback>) {
        let primitive = match self.primitive.borrow().as_ref() {
            Some(primitive) => Rc::clone(primitive),
            None => panic!("send primitive not implemented: attach one before calling send"),
        };

        match msg.into().into_envelope(self.config.accept_bare_payloads) {
            Ok(envelope) => {
                debug!(id = ?envelope.id, bytes = envelope.data.len(), "send");
                primitive.send(envelope, callback);
            }
            Err(err) => {
                warn!(error = %err, "send rejected");
                self.fail_later(callback, err);
            }
        }
    }

    /// Signal that a message arrived on the channel.
    ///
    /// On the next tick the callback runs, then every `"message"` listener.
    pub fn receive(&self, msg: impl Into<Message>, callback: Option<NotifyCallback>) {
        self.notify(Event::Message, msg.into(), callback);
    }

    /// Signal that a message arrived but nothing claimed it.
    ///
    /// Same contract as [`Transport::receive`], published as `"unhandledMessage"`.
    pub fn unhandled(&self, msg: impl Into<Message>, callback: Option<NotifyCallback>) {
        self.notify(Event::UnhandledMessage, msg.into(), callback);
    }

    fn notify(&self, event: Event, msg: Message, callback: Option<NotifyCallback>) {
        let envelope = match msg.into_envelope(self.config.accept_bare_payloads) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%event, error = %err, "notification rejected");
                self.fail_later(callback, err);
                return;
            }
        };

        debug!(%event, id = ?envelope.id, bytes = envelope.data.len(), "notification scheduled");
        let listeners = Rc::clone(&self.listeners);
        self.scheduler.defer(Box::new(move || {
            if let Some(callback) = callback {
                callback(Ok(()));
            }
            let handlers = listeners.borrow_mut().take_for_publish(event);
            for handler in handlers {
                handler(&envelope);
            }
        }));
    }

    fn fail_later<T: 'static>(
        &self,
        callback: Option<Box<dyn FnOnce(Result<T>)>>,
        err: TransportError,
    ) {
        if let Some(callback) = callback {
            self.scheduler.defer(Box::new(move || callback(Err(err))));
        }
    }

    pub fn on(&self, event: Event, listener: impl Fn(&Envelope) + 'static) -> ListenerId {
        self.listeners
            .borrow_mut()
            .subscribe(event, Rc::new(listener), false)
    }

    /// Subscribe for the next publish of `event` only.
    pub fn once(&self, event: Event, listener: impl Fn(&Envelope) + 'static) -> ListenerId {
        self.listeners
            .borrow_mut()
            .subscribe(event, Rc::new(listener), true)
    }

    pub fn off(&self, event: Event, id: ListenerId) -> bool {
        self.listeners.borrow_mut().unsubscribe(event, id)
    }

    pub fn remove_all_listeners(&self, event: Event) {
        self.listeners.borrow_mut().clear(event);
    }

    pub fn listener_count(&self, event: Event) -> usize {
        self.listeners.borrow().count(event)
    }
}
