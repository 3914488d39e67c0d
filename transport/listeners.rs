// Listener registry: event tag -> ordered subscribers
use freebird_core::Envelope;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Data arrived on the channel.
    Message,
    /// Data arrived but no application handler claimed it.
    UnhandledMessage,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Message => "message",
            Event::UnhandledMessage => "unhandledMessage",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Rc<dyn Fn(&Envelope)>;

struct Subscriber {
    id: ListenerId,
    once: bool,
    handler: Listener,
}

/// Subscribers per event, kept in insertion order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    message: Vec<Subscriber>,
    unhandled: Vec<Subscriber>,
}

impl Listeners {
    pub fn new() -> Self {
        Listeners::default()
    }

    fn slot(&mut self, event: Event) -> &mut Vec<Subscriber> {
        match event {
            Event::Message => &mut self.message,
            Event::UnhandledMessage => &mut self.unhandled,
        }
    }

    pub fn subscribe(&mut self, event: Event, handler: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.slot(event).push(Subscriber { id, once, handler });
        id
    }

    pub fn unsubscribe(&mut self, event: Event, id: ListenerId) -> bool {
        let subscribers = self.slot(event);
        match subscribers.iter().position(|s| s.id == id) {
            Some(pos) => {
                subscribers.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, event: Event) {
        self.slot(event).clear();
    }

    pub fn count(&self, event: Event) -> usize {
        match event {
            Event::Message => self.message.len(),
            Event::UnhandledMessage => self.unhandled.len(),
        }
    }

    /// Handlers to invoke for one publish, in subscription order.
    ///
    /// One-shot subscribers are removed here, so they fire at most once even
    /// if a handler publishes again. Callers invoke the returned handlers
    /// without holding the registry, which lets handlers subscribe or
    /// unsubscribe freely; such changes apply from the next publish.
    pub fn take_for_publish(&mut self, event: Event) -> Vec<Listener> {
        let subscribers = self.slot(event);
        let handlers: Vec<Listener> = subscribers.iter().map(|s| Rc::clone(&s.handler)).collect();
        subscribers.retain(|s| !s.once);
        handlers
    }
}
