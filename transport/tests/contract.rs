// Behavioral contract of Transport: validation, deferral, ordering
use freebird_transport::{
    complete, Envelope, Event, Message, Result, SendCallback, TaskQueue, TcpChannel, Transport,
    TransportError,
};
use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn setup() -> (TaskQueue, Transport) {
    let queue = TaskQueue::new();
    (queue.clone(), Transport::new(queue))
}

fn bare_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        any::<String>().prop_map(Message::Text),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Message::Binary),
        any::<f64>().prop_map(Message::Number),
        any::<bool>().prop_map(Message::Boolean),
        Just(Message::Null),
    ]
}

/// Runs `op` on an invalid message and checks the callback saw exactly one
/// type error, only after the caller's frame ended, with no event published.
fn assert_rejected_later<F>(msg: Message, op: F) -> std::result::Result<(), TestCaseError>
where
    F: FnOnce(&Transport, Message, Rc<RefCell<Vec<bool>>>),
{
    let (queue, transport) = setup();
    let published = Rc::new(Cell::new(0));
    for event in [Event::Message, Event::UnhandledMessage] {
        let p = Rc::clone(&published);
        transport.on(event, move |_| p.set(p.get() + 1));
    }

    let outcomes = Rc::new(RefCell::new(Vec::new()));
    op(&transport, msg, Rc::clone(&outcomes));
    prop_assert!(outcomes.borrow().is_empty());

    queue.run_until_idle();
    prop_assert_eq!(&*outcomes.borrow(), &vec![true]);
    prop_assert_eq!(published.get(), 0);
    Ok(())
}

proptest! {
    #[test]
    fn send_rejects_bare_values_without_touching_the_channel(msg in bare_message()) {
        let calls = Rc::new(Cell::new(0));
        assert_rejected_later(msg, |transport, msg, outcomes| {
            let c = Rc::clone(&calls);
            transport.attach(move |_: Envelope, cb: Option<SendCallback>| {
                c.set(c.get() + 1);
                complete(cb, Ok(0));
            });
            transport.send(msg, Some(Box::new(move |r: Result<usize>| {
                outcomes.borrow_mut().push(matches!(r, Err(ref e) if e.is_type_error()));
            })));
        })?;
        prop_assert_eq!(calls.get(), 0);
    }

    #[test]
    fn receive_rejects_bare_values(msg in bare_message()) {
        assert_rejected_later(msg, |transport, msg, outcomes| {
            transport.receive(msg, Some(Box::new(move |r: Result<()>| {
                outcomes.borrow_mut().push(matches!(r, Err(TransportError::InvalidEnvelope { .. })));
            })));
        })?;
    }

    #[test]
    fn unhandled_rejects_bare_values(msg in bare_message()) {
        assert_rejected_later(msg, |transport, msg, outcomes| {
            transport.unhandled(msg, Some(Box::new(move |r: Result<()>| {
                outcomes.borrow_mut().push(matches!(r, Err(TransportError::InvalidEnvelope { .. })));
            })));
        })?;
    }

    #[test]
    fn receive_calls_back_before_publishing(text in any::<String>(), binary in any::<bool>()) {
        let (queue, transport) = setup();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let envelope = if binary {
            Envelope::new(text.clone().into_bytes())
        } else {
            Envelope::new(text.clone())
        };

        let (l, expected) = (Rc::clone(&log), envelope.clone());
        transport.on(Event::Message, move |env| {
            assert_eq!(env, &expected);
            l.borrow_mut().push("event".into());
        });
        let l = Rc::clone(&log);
        transport.receive(envelope, Some(Box::new(move |r: Result<()>| {
            assert!(r.is_ok());
            l.borrow_mut().push("callback".into());
        })));

        prop_assert!(log.borrow().is_empty());
        queue.run_until_idle();
        prop_assert_eq!(&*log.borrow(), &vec!["callback".to_string(), "event".to_string()]);
    }
}

#[test]
fn unhandled_calls_back_before_publishing() {
    let (queue, transport) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let l = Rc::clone(&log);
    transport.on(Event::UnhandledMessage, move |env| {
        l.borrow_mut().push(format!("unhandled:{}", env.data.to_text()))
    });
    let l = Rc::clone(&log);
    transport.unhandled(
        Envelope::with_id("route-7", "nobody home"),
        Some(Box::new(move |_: Result<()>| l.borrow_mut().push("callback".into()))),
    );
    queue.run_until_idle();

    assert_eq!(*log.borrow(), vec!["callback", "unhandled:nobody home"]);
}

#[test]
#[should_panic(expected = "send primitive not implemented")]
fn send_on_fresh_transport_panics_for_envelopes() {
    let (_queue, transport) = setup();
    transport.send(Envelope::new("Hello"), Some(Box::new(|_: Result<usize>| {})));
}

#[test]
#[should_panic(expected = "send primitive not implemented")]
fn send_on_fresh_transport_panics_for_bare_values() {
    let (_queue, transport) = setup();
    transport.send("Hello", None);
}

#[test]
fn echo_through_simulated_channel_reaches_peer() {
    let queue = TaskQueue::new();
    let local = Transport::new(queue.clone());
    let peer = Rc::new(Transport::new(queue.clone()));

    let wire = Rc::clone(&peer);
    local.attach(move |env: Envelope, cb: Option<SendCallback>| {
        let len = env.data.len();
        wire.receive(Envelope::new(env.data), None);
        complete(cb, Ok(len));
    });

    let heard = Rc::new(RefCell::new(None));
    let h = Rc::clone(&heard);
    peer.on(Event::Message, move |env| *h.borrow_mut() = Some(env.data.to_text()));

    let written = Rc::new(Cell::new(None));
    let w = Rc::clone(&written);
    local.send(
        Envelope::new("Hello World"),
        Some(Box::new(move |r: Result<usize>| w.set(r.ok()))),
    );
    queue.run_until_idle();

    assert_eq!(written.get(), Some(11));
    assert_eq!(heard.borrow().as_deref(), Some("Hello World"));
}

#[test]
fn send_without_peer_reports_no_client() {
    let (queue, transport) = setup();
    transport.attach(TcpChannel::new("127.0.0.1:9"));

    let outcome = Rc::new(RefCell::new(None));
    let o = Rc::clone(&outcome);
    transport.send(
        Envelope::new("X"),
        Some(Box::new(move |r: Result<usize>| *o.borrow_mut() = Some(r))),
    );
    queue.run_until_idle();

    let outcome = outcome.borrow_mut().take();
    match outcome {
        Some(Err(err)) => {
            assert!(matches!(err, TransportError::NotConnected(_)));
            assert_eq!(err.to_string(), "No client connected");
        }
        other => panic!("expected a connection error, got {:?}", other),
    }
}

#[test]
fn two_listeners_run_once_each_in_order_after_callback() {
    let (queue, transport) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    for name in ["first", "second"] {
        let l = Rc::clone(&log);
        transport.on(Event::Message, move |_| l.borrow_mut().push(name.into()));
    }
    let l = Rc::clone(&log);
    transport.receive(
        Envelope::new("ping"),
        Some(Box::new(move |_: Result<()>| l.borrow_mut().push("callback".into()))),
    );
    queue.run_until_idle();

    assert_eq!(*log.borrow(), vec!["callback", "first", "second"]);
}

#[test]
fn deferred_effects_follow_call_order_across_calls() {
    let (queue, transport) = setup();
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let l = Rc::clone(&log);
    transport.on(Event::Message, move |env| l.borrow_mut().push(env.data.to_text()));
    let l = Rc::clone(&log);
    transport.on(Event::UnhandledMessage, move |env| {
        l.borrow_mut().push(format!("?{}", env.data.to_text()))
    });

    transport.receive(Envelope::new("a"), None);
    transport.unhandled(Envelope::new("b"), None);
    transport.receive(Envelope::new("c"), None);
    queue.run_until_idle();

    assert_eq!(*log.borrow(), vec!["a", "?b", "c"]);
}

#[test]
fn send_callback_may_send_again_on_the_same_transport() {
    let queue = TaskQueue::new();
    let transport = Rc::new(Transport::new(queue.clone()));
    let sent: Log = Rc::new(RefCell::new(Vec::new()));

    let s = Rc::clone(&sent);
    transport.attach(move |env: Envelope, cb: Option<SendCallback>| {
        s.borrow_mut().push(env.data.to_text());
        complete(cb, Ok(env.data.len()));
    });

    let weak = Rc::downgrade(&transport);
    let attached = Rc::new(Cell::new(false));
    let a = Rc::clone(&attached);
    transport.send(
        Envelope::new("first"),
        Some(Box::new(move |r: Result<usize>| {
            assert_eq!(r.ok(), Some(5));
            let transport = weak.upgrade().unwrap();
            a.set(transport.has_primitive());
            transport.send(Envelope::new("second"), None);
        })),
    );

    assert!(attached.get());
    assert_eq!(*sent.borrow(), vec!["first", "second"]);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn send_callback_may_replace_the_primitive() {
    let (_queue, transport) = setup();
    let transport = Rc::new(transport);
    let replaced = Rc::new(Cell::new(0));

    let weak = Rc::downgrade(&transport);
    let r = Rc::clone(&replaced);
    transport.attach(move |_: Envelope, cb: Option<SendCallback>| {
        if let Some(transport) = weak.upgrade() {
            let r = Rc::clone(&r);
            transport.attach(move |_: Envelope, cb: Option<SendCallback>| {
                r.set(r.get() + 1);
                complete(cb, Ok(0));
            });
        }
        complete(cb, Ok(0));
    });

    transport.send(Envelope::new("swap"), None);
    transport.send(Envelope::new("after"), None);
    assert_eq!(replaced.get(), 1);
}

#[test]
fn listener_may_reply_through_the_same_transport() {
    let queue = TaskQueue::new();
    let transport = Rc::new(Transport::new(queue.clone()));
    let sent = Rc::new(RefCell::new(Vec::new()));

    let s = Rc::clone(&sent);
    transport.attach(move |env: Envelope, cb: Option<SendCallback>| {
        s.borrow_mut().push(env.data.to_text());
        complete(cb, Ok(env.data.len()));
    });
    let weak = Rc::downgrade(&transport);
    transport.on(Event::Message, move |env| {
        if let Some(t) = weak.upgrade() {
            t.send(env.clone(), None);
        }
    });

    transport.receive(Envelope::new("echo me"), None);
    queue.run_until_idle();
    assert_eq!(*sent.borrow(), vec!["echo me"]);
}

#[test]
fn envelope_id_passes_through_untouched() {
    let (queue, transport) = setup();
    let ids = Rc::new(RefCell::new(Vec::new()));
    let i = Rc::clone(&ids);
    transport.on(Event::Message, move |env| i.borrow_mut().push(env.id.clone()));

    transport.receive(Envelope::with_id("abc", "x"), None);
    transport.receive(Envelope::new("y"), None);
    queue.run_until_idle();

    assert_eq!(*ids.borrow(), vec![Some("abc".into()), None]);
}
